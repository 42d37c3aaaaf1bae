//! Shared fixtures for end-to-end gate/promotion scenario tests.
//!
//! Everything here is deterministic apart from run ids; metric builders
//! produce values at tag precision so duplicate-detection behavior in tests
//! is intentional, never accidental.

use anyhow::Result;
use uuid::Uuid;

use mdk_promotion::{run_gate, GateOutcome, GateRequest, Metrics, ProductionCriteria};
use mdk_registry::ModelRegistry;

pub const MODEL_NAME: &str = "news_classifier";
pub const PROVIDER: &str = "openai";
pub const PROVIDER_MODEL: &str = "gpt-4o-mini";

/// Metrics that clear every default threshold, parameterized by accuracy.
/// Distinct accuracies yield distinct tag snapshots, so repeated calls never
/// collide with duplicate detection.
pub fn passing_metrics(accuracy: f64) -> Metrics {
    Metrics::from([
        ("category_accuracy".to_string(), accuracy),
        ("category_f1_weighted".to_string(), 0.90),
        ("category_precision_weighted".to_string(), 0.88),
        ("category_recall_weighted".to_string(), 0.86),
        ("sentiment_accuracy".to_string(), 0.88),
    ])
}

/// Metrics that fail accuracy and F1 while passing the rest.
pub fn failing_metrics() -> Metrics {
    Metrics::from([
        ("category_accuracy".to_string(), 0.85),
        ("category_f1_weighted".to_string(), 0.80),
        ("category_precision_weighted".to_string(), 0.88),
        ("category_recall_weighted".to_string(), 0.86),
        ("sentiment_accuracy".to_string(), 0.70),
    ])
}

pub fn gate_request(accuracy: f64, force: bool) -> GateRequest {
    GateRequest {
        model_name: MODEL_NAME.to_string(),
        run_id: Uuid::new_v4(),
        provider: PROVIDER.to_string(),
        model: PROVIDER_MODEL.to_string(),
        metrics: passing_metrics(accuracy),
        force,
    }
}

/// Gate one run with default thresholds and return the outcome.
pub fn gate_run(
    registry: &mut dyn ModelRegistry,
    criteria: &ProductionCriteria,
    accuracy: f64,
) -> Result<GateOutcome> {
    run_gate(registry, criteria, &gate_request(accuracy, false))
}

/// Drive a registry to the champion(v1) + challenger(v2) state the promotion
/// workflow starts from.
pub fn seed_champion_and_challenger(registry: &mut dyn ModelRegistry) -> Result<()> {
    let criteria = ProductionCriteria::default();
    gate_run(registry, &criteria, 0.90)?;
    gate_run(registry, &criteria, 0.93)?;
    Ok(())
}
