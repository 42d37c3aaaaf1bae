use anyhow::Result;

use mdk_registry::{Alias, ModelRegistry, RegistryEntry, Tags};

use crate::criteria::{evaluate_champion_criteria, evaluate_performance_criteria};
use crate::duplicate::{find_duplicate, metric_tag};
use crate::types::{GateOutcome, GateRequest, Metrics, ProductionCriteria};

/// Run the production gate for one candidate.
///
/// State machine:
/// 1. Criteria fail, no force  -> `Rejected`, registry untouched.
/// 2. Criteria pass, metrics identical to a stored version -> `DuplicateRejected`.
/// 3. No champion exists       -> register as `champion`.
/// 4. Beats champion by margin -> register as `challenger`.
/// 5. Passes but does not beat -> register as `candidate`.
/// 6. Criteria fail with force -> register with no alias.
///
/// The duplicate check only runs for passing metrics; forced-failing runs are
/// registered even when a forced twin already exists.
pub fn run_gate(
    registry: &mut dyn ModelRegistry,
    criteria: &ProductionCriteria,
    req: &GateRequest,
) -> Result<GateOutcome> {
    let decision = evaluate_performance_criteria(criteria, &req.metrics);

    if !decision.passed && !req.force {
        tracing::info!(
            model = %req.model_name,
            reason = %decision.reason,
            "gate rejected"
        );
        return Ok(GateOutcome::Rejected {
            reason: decision.reason,
        });
    }

    if decision.passed {
        if let Some(existing) = find_duplicate(registry, &req.model_name, &req.metrics)? {
            tracing::info!(
                model = %req.model_name,
                existing_version = existing.version,
                "gate rejected duplicate metrics"
            );
            return Ok(GateOutcome::DuplicateRejected { existing });
        }
    }

    let champion = lookup_champion(registry, &req.model_name)?;

    // Alias and recorded reason depend on where the run landed.
    let forced = !decision.passed;
    let (alias, reason) = if forced {
        (None, decision.reason.clone())
    } else {
        match &champion {
            None => (Some(Alias::Champion), decision.reason.clone()),
            Some(champ) => {
                let verdict = evaluate_champion_criteria(criteria, &req.metrics, champ);
                let alias = if verdict.beats {
                    Alias::Challenger
                } else {
                    Alias::Candidate
                };
                (Some(alias), verdict.reason)
            }
        }
    };

    let tags = registration_tags(&req.metrics, &req.provider, &req.model, decision.passed, &reason, forced);
    let description = if decision.passed {
        format!("PRODUCTION READY - {} {} - {}", req.provider, req.model, reason)
    } else {
        format!("EXPERIMENT ONLY - {} {} - {}", req.provider, req.model, reason)
    };

    let version = registry.register(&req.model_name, req.run_id, &tags, &description)?;
    if let Some(a) = alias {
        registry.set_alias(&req.model_name, a, version)?;
    }

    tracing::info!(
        model = %req.model_name,
        version,
        alias = alias.map(|a| a.as_str()).unwrap_or("none"),
        forced,
        "gate registered version"
    );

    Ok(GateOutcome::Registered {
        version,
        alias,
        forced,
    })
}

/// Champion lookup where absence is a normal state, not an error.
pub fn lookup_champion(
    registry: &dyn ModelRegistry,
    model_name: &str,
) -> Result<Option<RegistryEntry>> {
    match registry.get_by_alias(model_name, Alias::Champion) {
        Ok(entry) => Ok(Some(entry)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Tags persisted on every registered version: provider/model identity, the
/// metric snapshot at tag precision, the gate verdict, and the reason behind
/// it (truncated; registry backends cap tag values).
fn registration_tags(
    metrics: &Metrics,
    provider: &str,
    model: &str,
    production_ready: bool,
    reason: &str,
    forced: bool,
) -> Tags {
    let m = |key: &str| metrics.get(key).copied().unwrap_or(0.0);

    let mut tags = Tags::new();
    tags.insert("provider".to_string(), provider.to_string());
    tags.insert("model".to_string(), model.to_string());
    tags.insert(
        "category_accuracy".to_string(),
        metric_tag(m("category_accuracy")),
    );
    tags.insert(
        "category_f1".to_string(),
        metric_tag(m("category_f1_weighted")),
    );
    tags.insert(
        "sentiment_accuracy".to_string(),
        metric_tag(m("sentiment_accuracy")),
    );
    tags.insert(
        "production_ready".to_string(),
        production_ready.to_string(),
    );
    tags.insert(
        "validation_reason".to_string(),
        truncate_chars(reason, 250),
    );
    if forced {
        tags.insert("force_registered".to_string(), "true".to_string());
    }
    tags
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
