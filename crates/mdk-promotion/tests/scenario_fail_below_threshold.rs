use mdk_promotion::{evaluate_performance_criteria, Metrics, ProductionCriteria};

fn metrics(accuracy: f64, f1: f64, precision: f64, recall: f64) -> Metrics {
    Metrics::from([
        ("category_accuracy".to_string(), accuracy),
        ("category_f1_weighted".to_string(), f1),
        ("category_precision_weighted".to_string(), precision),
        ("category_recall_weighted".to_string(), recall),
    ])
}

#[test]
fn fails_below_accuracy_threshold_with_exact_reason() {
    let criteria = ProductionCriteria::default();
    let decision = evaluate_performance_criteria(&criteria, &metrics(0.85, 0.90, 0.88, 0.86));

    assert!(!decision.passed);
    assert_eq!(decision.reason, "Accuracy 85.00% below 90.00% threshold");
}

#[test]
fn fails_with_multiple_reasons_joined() {
    let criteria = ProductionCriteria::default();
    let decision = evaluate_performance_criteria(&criteria, &metrics(0.85, 0.80, 0.88, 0.86));

    assert!(!decision.passed);
    assert_eq!(
        decision.reason,
        "Accuracy 85.00% below 90.00% threshold; F1 score 0.800 below 0.850 threshold"
    );
}

#[test]
fn fails_each_metric_with_its_own_wording() {
    let criteria = ProductionCriteria::default();
    let decision = evaluate_performance_criteria(&criteria, &metrics(0.80, 0.80, 0.70, 0.70));

    assert!(!decision.passed);
    assert!(decision.reason.contains("Accuracy"), "{}", decision.reason);
    assert!(decision.reason.contains("F1 score"), "{}", decision.reason);
    assert!(
        decision.reason.contains("Precision 0.700 below 0.800 threshold"),
        "{}",
        decision.reason
    );
    assert!(
        decision.reason.contains("Recall 0.700 below 0.800 threshold"),
        "{}",
        decision.reason
    );
}

#[test]
fn missing_metrics_read_as_zero_and_fail_everything() {
    // A run that reports nothing must not pass by omission.
    let criteria = ProductionCriteria::default();
    let decision = evaluate_performance_criteria(&criteria, &Metrics::new());

    assert!(!decision.passed);
    assert_eq!(decision.reason.matches("below").count(), 4);
    assert!(decision.reason.starts_with("Accuracy 0.00% below 90.00% threshold"));
}

#[test]
fn epsilon_below_threshold_still_fails() {
    let criteria = ProductionCriteria::default();
    let decision =
        evaluate_performance_criteria(&criteria, &metrics(0.89999, 0.90, 0.88, 0.86));

    assert!(!decision.passed);
    assert!(decision.reason.contains("Accuracy"), "{}", decision.reason);
}
