//! Champion comparison: the improvement margin is inclusive.
//!
//! GREEN when:
//! - New accuracy exactly min_accuracy_improvement above the champion beats it.
//! - Anything short of the margin does not, with the full comparison reason.

use mdk_promotion::{evaluate_champion_criteria, Metrics, ProductionCriteria};
use mdk_registry::{Alias, MemRegistry, ModelRegistry, RegistryEntry, Tags};
use uuid::Uuid;

fn champion_with_accuracy(accuracy: f64) -> RegistryEntry {
    let mut reg = MemRegistry::new();
    let tags = Tags::from([
        ("provider".to_string(), "openai".to_string()),
        ("model".to_string(), "gpt-4o-mini".to_string()),
        ("category_accuracy".to_string(), format!("{:.4}", accuracy)),
    ]);
    let v = reg
        .register("news_classifier", Uuid::new_v4(), &tags, "champion")
        .unwrap();
    reg.set_alias("news_classifier", Alias::Champion, v).unwrap();
    reg.get_by_alias("news_classifier", Alias::Champion).unwrap()
}

fn metrics_with_accuracy(accuracy: f64) -> Metrics {
    Metrics::from([("category_accuracy".to_string(), accuracy)])
}

#[test]
fn beats_champion_exactly_at_margin() {
    let criteria = ProductionCriteria::default();
    let champ = champion_with_accuracy(0.90);

    let verdict = evaluate_champion_criteria(&criteria, &metrics_with_accuracy(0.92), &champ);

    assert!(verdict.beats, "2-point gain at a 2-point margin must beat");
    assert_eq!(verdict.reason, "Beats champion by 2.00%");
}

#[test]
fn falls_short_of_margin_with_comparison_reason() {
    let criteria = ProductionCriteria::default();
    let champ = champion_with_accuracy(0.90);

    let verdict = evaluate_champion_criteria(&criteria, &metrics_with_accuracy(0.915), &champ);

    assert!(!verdict.beats);
    assert!((verdict.improvement - 0.015).abs() < 1e-9);
    assert_eq!(
        verdict.reason,
        "Accuracy improvement 1.50% below 2.00% threshold (current: 90.00%, new: 91.50%)"
    );
}

#[test]
fn regression_reports_negative_improvement() {
    let criteria = ProductionCriteria::default();
    let champ = champion_with_accuracy(0.93);

    let verdict = evaluate_champion_criteria(&criteria, &metrics_with_accuracy(0.91), &champ);

    assert!(!verdict.beats);
    assert!(verdict.improvement < 0.0);
    assert!(verdict.reason.contains("current: 93.00%"), "{}", verdict.reason);
    assert!(verdict.reason.contains("new: 91.00%"), "{}", verdict.reason);
}

#[test]
fn clear_win_beats_champion() {
    let criteria = ProductionCriteria::default();
    let champ = champion_with_accuracy(0.90);

    let verdict = evaluate_champion_criteria(&criteria, &metrics_with_accuracy(0.93), &champ);

    assert!(verdict.beats);
    assert_eq!(verdict.reason, "Beats champion by 3.00%");
}
