//! Production gating and champion/challenger promotion over a model registry.
//!
//! The gate checks a run's metrics against minimum criteria, compares passing
//! runs to the current champion, and registers the run with a lifecycle alias.
//! A separate approval workflow swaps a challenger into the champion slot,
//! recording every applied registry mutation in a hash-chained transition log.

mod approve;
mod criteria;
mod duplicate;
mod gate;
mod types;

pub use approve::{run_promotion, ApprovalGate, AutoApprove};
pub use criteria::{
    criteria_from_config, evaluate_champion_criteria, evaluate_performance_criteria,
    format_criteria_report, format_criteria_summary,
};
pub use duplicate::find_duplicate;
pub use gate::{lookup_champion, run_gate};
pub use types::{
    ApprovalDecision, ChampionDecision, CriteriaDecision, EntryCard, GateOutcome, GateRequest,
    Metrics, ProductionCriteria, PromoteOutcome, PromotionComparison,
};
