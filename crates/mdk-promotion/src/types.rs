use std::collections::BTreeMap;

use mdk_registry::{Alias, RegistryEntry};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metric name -> value, as produced by an evaluation run.
/// Absent metrics are treated as 0.0 everywhere downstream.
pub type Metrics = BTreeMap<String, f64>;

// ---------------------------------------------------------------------------
// Criteria
// ---------------------------------------------------------------------------

/// Thresholds for production gating and champion comparison.
///
/// All boundary checks are inclusive on the passing side: a metric exactly at
/// its threshold passes, and an accuracy improvement exactly at
/// `min_accuracy_improvement` beats the champion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProductionCriteria {
    /// Minimum category accuracy (0..1).
    pub min_accuracy: f64,
    /// Minimum category F1 score (0..1).
    pub min_f1_score: f64,
    /// Minimum category precision (0..1).
    pub min_precision: f64,
    /// Minimum category recall (0..1).
    pub min_recall: f64,
    /// Minimum accuracy gain over the champion (absolute, e.g. 0.02 = 2 points).
    pub min_accuracy_improvement: f64,
    /// Maximum p95 inference latency in seconds.
    pub max_latency_p95: f64,
    /// Maximum p99 inference latency in seconds.
    pub max_latency_p99: f64,
    /// Maximum tolerated cost increase as a fraction of champion cost.
    pub max_cost_increase: f64,
    /// Cost savings fraction that excuses a small accuracy shortfall.
    pub min_cost_savings: f64,
}

impl Default for ProductionCriteria {
    fn default() -> Self {
        Self {
            min_accuracy: 0.90,
            min_f1_score: 0.85,
            min_precision: 0.80,
            min_recall: 0.80,
            min_accuracy_improvement: 0.02,
            max_latency_p95: 3.0,
            max_latency_p99: 5.0,
            max_cost_increase: 0.20,
            min_cost_savings: 0.30,
        }
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Result of checking a run's metrics against the minimum criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaDecision {
    pub passed: bool,
    /// `"All performance criteria met"` on pass, otherwise the failed checks
    /// joined with `"; "` in stable field order.
    pub reason: String,
}

/// Result of comparing a passing run against the current champion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChampionDecision {
    pub beats: bool,
    /// New accuracy minus champion accuracy (may be negative).
    pub improvement: f64,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Gate request / outcome
// ---------------------------------------------------------------------------

/// One candidate run submitted to the production gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateRequest {
    /// Registered model name (versions and aliases live under it).
    pub model_name: String,
    /// Evaluation run that produced the metrics.
    pub run_id: Uuid,
    /// Serving provider identity, e.g. `"openai"`.
    pub provider: String,
    /// Provider-side model identifier, e.g. `"gpt-4o-mini"`.
    pub model: String,
    pub metrics: Metrics,
    /// Register even when criteria fail. Forced registrations get no alias.
    pub force: bool,
}

/// What the gate did with a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GateOutcome {
    /// Criteria failed and `force` was not set. Nothing was registered.
    Rejected { reason: String },
    /// Criteria passed but an existing version already carries identical
    /// metrics (at stored-tag precision). Nothing was registered.
    DuplicateRejected { existing: RegistryEntry },
    /// A new version was registered.
    Registered {
        version: i64,
        /// Alias assigned at registration: `champion` when no champion
        /// existed, `challenger` when the champion was beaten, `candidate`
        /// otherwise. `None` for forced-failing registrations.
        alias: Option<Alias>,
        /// True when criteria failed and `force` carried the registration.
        forced: bool,
    },
}

// ---------------------------------------------------------------------------
// Promotion comparison / outcome
// ---------------------------------------------------------------------------

/// Summary of one side of a promotion decision, built from stored tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryCard {
    pub version: i64,
    pub provider: String,
    pub model: String,
    pub accuracy: f64,
    pub f1_score: f64,
}

impl EntryCard {
    pub fn from_entry(entry: &RegistryEntry) -> Self {
        Self {
            version: entry.version,
            provider: entry.tag_str("provider").to_string(),
            model: entry.tag_str("model").to_string(),
            accuracy: entry.tag_f64("category_accuracy"),
            f1_score: entry.tag_f64("category_f1"),
        }
    }
}

/// What an [`crate::ApprovalGate`] sees before deciding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionComparison {
    pub model_name: String,
    pub challenger: EntryCard,
    /// `None` is unreachable in practice (a challenger implies a champion
    /// existed at gate time) but tolerated: promotion then installs the
    /// challenger directly.
    pub champion: Option<EntryCard>,
}

/// Verdict from an approval gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

/// Result of a promotion-approval invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PromoteOutcome {
    /// No version holds the `challenger` alias. No-op.
    NoChallenger,
    /// The approval gate rejected the swap. No registry mutation happened.
    Cancelled,
    /// The challenger is now champion.
    Promoted {
        new_champion: i64,
        /// Version of the replaced champion, if one existed.
        defeated: Option<i64>,
    },
}
