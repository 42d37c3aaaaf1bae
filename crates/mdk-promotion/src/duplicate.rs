use anyhow::Result;

use mdk_registry::{ModelRegistry, RegistryEntry};

use crate::types::Metrics;

/// Metric tags are stored at four decimal places; duplicate detection and
/// storage must agree on precision or re-registering a run would never match.
pub(crate) fn metric_tag(v: f64) -> String {
    format!("{:.4}", v)
}

/// Tag keys compared for duplicate detection, with their source metric names.
const DUPLICATE_TAG_KEYS: &[(&str, &str)] = &[
    ("category_accuracy", "category_accuracy"),
    ("category_f1", "category_f1_weighted"),
    ("sentiment_accuracy", "sentiment_accuracy"),
];

/// Find an existing version whose stored metric tags equal the incoming
/// metrics at tag precision. Returns the earliest matching version.
///
/// Comparison is on the formatted strings, so values differing only past the
/// fourth decimal place count as duplicates.
pub fn find_duplicate(
    registry: &dyn ModelRegistry,
    model_name: &str,
    metrics: &Metrics,
) -> Result<Option<RegistryEntry>> {
    let versions = registry.search_versions(model_name)?;

    for entry in versions {
        let matches = DUPLICATE_TAG_KEYS.iter().all(|(tag_key, metric_key)| {
            let incoming = metric_tag(metrics.get(*metric_key).copied().unwrap_or(0.0));
            entry.tags.get(*tag_key).map(String::as_str) == Some(incoming.as_str())
        });
        if matches {
            return Ok(Some(entry));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_tag_is_four_places() {
        assert_eq!(metric_tag(0.93), "0.9300");
        assert_eq!(metric_tag(0.93004), "0.9300");
        assert_eq!(metric_tag(0.9301), "0.9301");
        assert_eq!(metric_tag(0.0), "0.0000");
    }
}
