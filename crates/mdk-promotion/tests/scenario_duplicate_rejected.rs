//! Duplicate detection at stored-tag precision.
//!
//! GREEN when:
//! - Re-submitting identical metrics is rejected without a new version.
//! - Metrics that differ only past the fourth decimal place are duplicates.
//! - Metrics that differ at the fourth decimal place are not.

use mdk_promotion::{run_gate, GateOutcome, GateRequest, Metrics, ProductionCriteria};
use mdk_registry::{MemRegistry, ModelRegistry};
use uuid::Uuid;

const MODEL: &str = "news_classifier";

fn metrics(accuracy: f64, f1: f64, sentiment: f64) -> Metrics {
    Metrics::from([
        ("category_accuracy".to_string(), accuracy),
        ("category_f1_weighted".to_string(), f1),
        ("category_precision_weighted".to_string(), 0.88),
        ("category_recall_weighted".to_string(), 0.86),
        ("sentiment_accuracy".to_string(), sentiment),
    ])
}

fn request(metrics: Metrics) -> GateRequest {
    GateRequest {
        model_name: MODEL.to_string(),
        run_id: Uuid::new_v4(),
        provider: "openai".to_string(),
        model: "gpt-4o-mini".to_string(),
        metrics,
        force: false,
    }
}

#[test]
fn identical_metrics_are_rejected_as_duplicate() {
    let mut reg = MemRegistry::new();
    let criteria = ProductionCriteria::default();

    run_gate(&mut reg, &criteria, &request(metrics(0.93, 0.90, 0.88))).unwrap();
    let outcome = run_gate(&mut reg, &criteria, &request(metrics(0.93, 0.90, 0.88))).unwrap();

    match outcome {
        GateOutcome::DuplicateRejected { existing } => {
            assert_eq!(existing.version, 1);
        }
        other => panic!("expected duplicate rejection, got {other:?}"),
    }
    assert_eq!(reg.search_versions(MODEL).unwrap().len(), 1);
}

#[test]
fn sub_tag_precision_differences_are_duplicates() {
    let mut reg = MemRegistry::new();
    let criteria = ProductionCriteria::default();

    run_gate(&mut reg, &criteria, &request(metrics(0.93001, 0.90, 0.88))).unwrap();
    // 0.93004 and 0.93001 both store as "0.9300".
    let outcome = run_gate(&mut reg, &criteria, &request(metrics(0.93004, 0.90, 0.88))).unwrap();

    assert!(matches!(outcome, GateOutcome::DuplicateRejected { .. }));
}

#[test]
fn tag_precision_differences_are_distinct_runs() {
    let mut reg = MemRegistry::new();
    let criteria = ProductionCriteria::default();

    run_gate(&mut reg, &criteria, &request(metrics(0.9300, 0.90, 0.88))).unwrap();
    let outcome = run_gate(&mut reg, &criteria, &request(metrics(0.9301, 0.90, 0.88))).unwrap();

    assert!(
        matches!(outcome, GateOutcome::Registered { version: 2, .. }),
        "got {outcome:?}"
    );
}

#[test]
fn sentiment_accuracy_participates_in_duplicate_check() {
    let mut reg = MemRegistry::new();
    let criteria = ProductionCriteria::default();

    run_gate(&mut reg, &criteria, &request(metrics(0.93, 0.90, 0.88))).unwrap();
    let outcome = run_gate(&mut reg, &criteria, &request(metrics(0.93, 0.90, 0.91))).unwrap();

    assert!(
        matches!(outcome, GateOutcome::Registered { version: 2, .. }),
        "got {outcome:?}"
    );
}
