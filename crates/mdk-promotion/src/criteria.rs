use serde_json::Value;

use mdk_registry::RegistryEntry;

use crate::types::{ChampionDecision, CriteriaDecision, Metrics, ProductionCriteria};

// ============================================================================
// Performance criteria
// ============================================================================

/// Check a run's metrics against the minimum production criteria.
///
/// Absent metrics read as 0.0 and therefore fail their checks; a run that
/// reports nothing fails everything rather than passing by omission.
pub fn evaluate_performance_criteria(
    criteria: &ProductionCriteria,
    metrics: &Metrics,
) -> CriteriaDecision {
    let accuracy = metric(metrics, "category_accuracy");
    let f1_score = metric(metrics, "category_f1_weighted");
    let precision = metric(metrics, "category_precision_weighted");
    let recall = metric(metrics, "category_recall_weighted");

    let mut fail_reasons = Vec::new();

    // Stable ordering matches field order in ProductionCriteria.
    if accuracy < criteria.min_accuracy {
        fail_reasons.push(format!(
            "Accuracy {} below {} threshold",
            fmt_pct(accuracy),
            fmt_pct(criteria.min_accuracy)
        ));
    }
    if f1_score < criteria.min_f1_score {
        fail_reasons.push(format!(
            "F1 score {:.3} below {:.3} threshold",
            f1_score, criteria.min_f1_score
        ));
    }
    if precision < criteria.min_precision {
        fail_reasons.push(format!(
            "Precision {:.3} below {:.3} threshold",
            precision, criteria.min_precision
        ));
    }
    if recall < criteria.min_recall {
        fail_reasons.push(format!(
            "Recall {:.3} below {:.3} threshold",
            recall, criteria.min_recall
        ));
    }

    if fail_reasons.is_empty() {
        CriteriaDecision {
            passed: true,
            reason: "All performance criteria met".to_string(),
        }
    } else {
        CriteriaDecision {
            passed: false,
            reason: fail_reasons.join("; "),
        }
    }
}

// ============================================================================
// Champion comparison
// ============================================================================

/// Compare a passing run against the current champion's stored accuracy.
///
/// The margin is inclusive: an improvement exactly equal to
/// `min_accuracy_improvement` beats the champion.
pub fn evaluate_champion_criteria(
    criteria: &ProductionCriteria,
    metrics: &Metrics,
    champion: &RegistryEntry,
) -> ChampionDecision {
    let new_accuracy = metric(metrics, "category_accuracy");
    let champion_accuracy = champion.tag_f64("category_accuracy");
    let improvement = new_accuracy - champion_accuracy;

    if improvement >= criteria.min_accuracy_improvement {
        ChampionDecision {
            beats: true,
            improvement,
            reason: format!("Beats champion by {}", fmt_pct(improvement)),
        }
    } else {
        ChampionDecision {
            beats: false,
            improvement,
            reason: format!(
                "Accuracy improvement {} below {} threshold (current: {}, new: {})",
                fmt_pct(improvement),
                fmt_pct(criteria.min_accuracy_improvement),
                fmt_pct(champion_accuracy),
                fmt_pct(new_accuracy)
            ),
        }
    }
}

// ============================================================================
// Config binding
// ============================================================================

/// Build criteria from an effective config document. Every threshold has a
/// default; `/criteria/*` leaves override field-by-field.
pub fn criteria_from_config(config_json: &Value) -> ProductionCriteria {
    let mut c = ProductionCriteria::default();
    override_f64(config_json, "/criteria/min_accuracy", &mut c.min_accuracy);
    override_f64(config_json, "/criteria/min_f1_score", &mut c.min_f1_score);
    override_f64(config_json, "/criteria/min_precision", &mut c.min_precision);
    override_f64(config_json, "/criteria/min_recall", &mut c.min_recall);
    override_f64(
        config_json,
        "/criteria/min_accuracy_improvement",
        &mut c.min_accuracy_improvement,
    );
    override_f64(config_json, "/criteria/max_latency_p95", &mut c.max_latency_p95);
    override_f64(config_json, "/criteria/max_latency_p99", &mut c.max_latency_p99);
    override_f64(
        config_json,
        "/criteria/max_cost_increase",
        &mut c.max_cost_increase,
    );
    override_f64(
        config_json,
        "/criteria/min_cost_savings",
        &mut c.min_cost_savings,
    );
    c
}

fn override_f64(config_json: &Value, pointer: &str, slot: &mut f64) {
    if let Some(v) = config_json.pointer(pointer).and_then(Value::as_f64) {
        *slot = v;
    }
}

/// One line per threshold, for operator-facing reporting.
pub fn format_criteria_summary(c: &ProductionCriteria) -> String {
    let mut out = String::new();
    out.push_str(&format!("min_accuracy={}\n", fmt_pct(c.min_accuracy)));
    out.push_str(&format!("min_f1_score={:.3}\n", c.min_f1_score));
    out.push_str(&format!("min_precision={:.3}\n", c.min_precision));
    out.push_str(&format!("min_recall={:.3}\n", c.min_recall));
    out.push_str(&format!(
        "min_accuracy_improvement={}\n",
        fmt_pct(c.min_accuracy_improvement)
    ));
    out.push_str(&format!("max_latency_p95={:.1}s\n", c.max_latency_p95));
    out.push_str(&format!("max_latency_p99={:.1}s\n", c.max_latency_p99));
    out.push_str(&format!("max_cost_increase={}\n", fmt_pct(c.max_cost_increase)));
    out.push_str(&format!("min_cost_savings={}\n", fmt_pct(c.min_cost_savings)));
    out
}

/// Per-metric report of one run against the thresholds: each evaluated metric
/// with its threshold and pass/fail, ending with the overall verdict.
pub fn format_criteria_report(c: &ProductionCriteria, metrics: &Metrics) -> String {
    let accuracy = metric(metrics, "category_accuracy");
    let f1_score = metric(metrics, "category_f1_weighted");
    let precision = metric(metrics, "category_precision_weighted");
    let recall = metric(metrics, "category_recall_weighted");
    let decision = evaluate_performance_criteria(c, metrics);

    let mut out = String::new();
    out.push_str(&format!(
        "accuracy={} threshold={} pass={}\n",
        fmt_pct(accuracy),
        fmt_pct(c.min_accuracy),
        accuracy >= c.min_accuracy
    ));
    out.push_str(&format!(
        "f1_score={:.3} threshold={:.3} pass={}\n",
        f1_score,
        c.min_f1_score,
        f1_score >= c.min_f1_score
    ));
    out.push_str(&format!(
        "precision={:.3} threshold={:.3} pass={}\n",
        precision,
        c.min_precision,
        precision >= c.min_precision
    ));
    out.push_str(&format!(
        "recall={:.3} threshold={:.3} pass={}\n",
        recall,
        c.min_recall,
        recall >= c.min_recall
    ));
    out.push_str(&format!("passed={} reason={}\n", decision.passed, decision.reason));
    out
}

// ============================================================================
// Helpers
// ============================================================================

/// Fractions render as percentages in reasons: 0.85 -> "85.00%".
pub(crate) fn fmt_pct(v: f64) -> String {
    format!("{:.2}%", v * 100.0)
}

pub(crate) fn metric(metrics: &Metrics, key: &str) -> f64 {
    metrics.get(key).copied().unwrap_or(0.0)
}
