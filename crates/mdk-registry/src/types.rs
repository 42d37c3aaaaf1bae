use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Key-value tags persisted on a registry entry (metrics snapshot as strings,
/// provider/model identity, validation outcome).
pub type Tags = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Alias
// ---------------------------------------------------------------------------

/// Lifecycle alias a registered version can hold.
///
/// Aliases are stored per model as an alias -> version map, so at most one
/// version holds `champion` for a given model name at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alias {
    /// Currently served production version.
    Champion,
    /// Outperformed the champion; awaiting promotion approval.
    Challenger,
    /// Passed minimum criteria but did not beat the champion.
    Candidate,
    /// Former champion replaced by a promoted challenger.
    Defeated,
}

impl Alias {
    pub fn as_str(&self) -> &'static str {
        match self {
            Alias::Champion => "champion",
            Alias::Challenger => "challenger",
            Alias::Candidate => "candidate",
            Alias::Defeated => "defeated",
        }
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Alias {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "champion" => Ok(Alias::Champion),
            "challenger" => Ok(Alias::Challenger),
            "candidate" => Ok(Alias::Candidate),
            "defeated" => Ok(Alias::Defeated),
            other => Err(format!("unknown alias: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry entry
// ---------------------------------------------------------------------------

/// A versioned record in the registry, as returned by lookups.
///
/// `aliases` is derived from the model's alias map at read time; mutating it
/// on this struct has no effect on the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Monotonic integer version, starting at 1 per model name.
    pub version: i64,
    /// Reference to the evaluation run that produced this version.
    pub run_id: Uuid,
    pub tags: Tags,
    pub description: String,
    /// Aliases currently pointing at this version (sorted, possibly empty).
    pub aliases: Vec<Alias>,
    pub created_at_utc: DateTime<Utc>,
}

impl RegistryEntry {
    /// Tag value parsed as f64, defaulting to 0.0 when absent or malformed.
    /// Mirrors the absence semantics of the metrics mapping itself.
    pub fn tag_f64(&self, key: &str) -> f64 {
        self.tags
            .get(key)
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(0.0)
    }

    /// Tag value as a string, defaulting to "unknown" when absent.
    pub fn tag_str(&self, key: &str) -> &str {
        self.tags.get(key).map(String::as_str).unwrap_or("unknown")
    }

    pub fn has_alias(&self, alias: Alias) -> bool {
        self.aliases.contains(&alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_roundtrips_through_str() {
        for a in [
            Alias::Champion,
            Alias::Challenger,
            Alias::Candidate,
            Alias::Defeated,
        ] {
            assert_eq!(a.as_str().parse::<Alias>().unwrap(), a);
        }
    }

    #[test]
    fn alias_parse_is_case_insensitive() {
        assert_eq!("Champion".parse::<Alias>().unwrap(), Alias::Champion);
        assert_eq!(" CHALLENGER ".parse::<Alias>().unwrap(), Alias::Challenger);
    }

    #[test]
    fn alias_parse_rejects_unknown() {
        assert!("production".parse::<Alias>().is_err());
    }

    #[test]
    fn tag_f64_defaults_to_zero() {
        let entry = RegistryEntry {
            version: 1,
            run_id: Uuid::new_v4(),
            tags: Tags::from([("category_accuracy".to_string(), "0.9300".to_string())]),
            description: String::new(),
            aliases: vec![],
            created_at_utc: Utc::now(),
        };
        assert!((entry.tag_f64("category_accuracy") - 0.93).abs() < 1e-9);
        assert_eq!(entry.tag_f64("missing"), 0.0);
        assert_eq!(entry.tag_str("provider"), "unknown");
    }
}
