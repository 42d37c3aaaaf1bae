use anyhow::Result;
use serde_json::json;
use uuid::Uuid;

use mdk_audit::TransitionLog;
use mdk_registry::{Alias, ModelRegistry};

use crate::gate::lookup_champion;
use crate::types::{ApprovalDecision, EntryCard, PromoteOutcome, PromotionComparison};

/// Human-or-policy decision point for champion replacement.
///
/// Implementations must fail closed: on any doubt (timeout, unreadable input,
/// closed stdin) return `Rejected` or an error, never `Approved`.
pub trait ApprovalGate {
    fn decide(&self, comparison: &PromotionComparison) -> Result<ApprovalDecision>;
}

/// Approves every promotion. For automation and tests.
pub struct AutoApprove;

impl ApprovalGate for AutoApprove {
    fn decide(&self, _comparison: &PromotionComparison) -> Result<ApprovalDecision> {
        Ok(ApprovalDecision::Approved)
    }
}

/// Promote the current challenger to champion, if one exists and the gate
/// approves.
///
/// The alias swap is multi-step with no registry transaction. Every applied
/// mutation is appended to the transition log before the next one runs, so a
/// failure mid-sequence leaves an exact record of which steps took effect.
/// Recovery is manual, guided by that record.
///
/// Applied order: old champion -> `defeated`, `champion` -> challenger
/// version, delete `challenger`, then both description rewrites.
pub fn run_promotion(
    registry: &mut dyn ModelRegistry,
    model_name: &str,
    gate: &dyn ApprovalGate,
    log: &mut TransitionLog,
) -> Result<PromoteOutcome> {
    let challenger = match registry.get_by_alias(model_name, Alias::Challenger) {
        Ok(entry) => entry,
        Err(e) if e.is_not_found() => {
            tracing::info!(model = %model_name, "no challenger to promote");
            return Ok(PromoteOutcome::NoChallenger);
        }
        Err(e) => return Err(e.into()),
    };
    let champion = lookup_champion(registry, model_name)?;

    let comparison = PromotionComparison {
        model_name: model_name.to_string(),
        challenger: EntryCard::from_entry(&challenger),
        champion: champion.as_ref().map(EntryCard::from_entry),
    };

    if gate.decide(&comparison)? == ApprovalDecision::Rejected {
        tracing::info!(model = %model_name, "promotion cancelled by approval gate");
        return Ok(PromoteOutcome::Cancelled);
    }

    let workflow_id = Uuid::new_v4();
    log.append(
        workflow_id,
        model_name,
        "PROMOTION_START",
        None,
        None,
        serde_json::to_value(&comparison)?,
    )?;

    if let Some(champ) = &champion {
        registry.set_alias(model_name, Alias::Defeated, champ.version)?;
        log.append(
            workflow_id,
            model_name,
            "SET_ALIAS",
            Some(Alias::Defeated.as_str()),
            Some(champ.version),
            json!({}),
        )?;
    }

    registry.set_alias(model_name, Alias::Champion, challenger.version)?;
    log.append(
        workflow_id,
        model_name,
        "SET_ALIAS",
        Some(Alias::Champion.as_str()),
        Some(challenger.version),
        json!({}),
    )?;

    registry.delete_alias(model_name, Alias::Challenger)?;
    log.append(
        workflow_id,
        model_name,
        "DELETE_ALIAS",
        Some(Alias::Challenger.as_str()),
        Some(challenger.version),
        json!({}),
    )?;

    let champion_text = match &champion {
        Some(champ) => format!(
            "CHAMPION - promoted from challenger (replaced v{})",
            champ.version
        ),
        None => "CHAMPION - promoted from challenger".to_string(),
    };
    registry.update_description(model_name, challenger.version, &champion_text)?;
    log.append(
        workflow_id,
        model_name,
        "UPDATE_DESCRIPTION",
        None,
        Some(challenger.version),
        json!({ "text": champion_text }),
    )?;

    if let Some(champ) = &champion {
        let defeated_text = format!("DEFEATED - replaced by v{}", challenger.version);
        registry.update_description(model_name, champ.version, &defeated_text)?;
        log.append(
            workflow_id,
            model_name,
            "UPDATE_DESCRIPTION",
            None,
            Some(champ.version),
            json!({ "text": defeated_text }),
        )?;
    }

    let defeated = champion.as_ref().map(|c| c.version);
    log.append(
        workflow_id,
        model_name,
        "PROMOTION_COMPLETE",
        None,
        Some(challenger.version),
        json!({ "new_champion": challenger.version, "defeated": defeated }),
    )?;

    tracing::info!(
        model = %model_name,
        new_champion = challenger.version,
        defeated = ?defeated,
        "promotion applied"
    );

    Ok(PromoteOutcome::Promoted {
        new_champion: challenger.version,
        defeated,
    })
}
