use std::fmt;

use uuid::Uuid;

use crate::types::{Alias, RegistryEntry, Tags};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors a [`ModelRegistry`] implementation may return.
#[derive(Debug)]
pub enum RegistryError {
    /// Storage or transport failure (disk, network).
    Io(String),
    /// The requested model, version, or alias does not exist.
    ///
    /// For alias lookups this is a valid "absence" state, not a failure:
    /// callers check [`RegistryError::is_not_found`] and proceed with
    /// first-champion semantics.
    NotFound { name: String, selector: String },
    /// A stored document could not be decoded.
    Decode(String),
    /// The registry is misconfigured (bad path, missing setting).
    Config(String),
}

impl RegistryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound { .. })
    }

    pub(crate) fn not_found(name: &str, selector: impl Into<String>) -> Self {
        RegistryError::NotFound {
            name: name.to_string(),
            selector: selector.into(),
        }
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Io(msg) => write!(f, "registry io error: {msg}"),
            RegistryError::NotFound { name, selector } => {
                write!(f, "not found: model={name} selector={selector}")
            }
            RegistryError::Decode(msg) => write!(f, "registry decode error: {msg}"),
            RegistryError::Config(msg) => write!(f, "registry config error: {msg}"),
        }
    }
}

impl std::error::Error for RegistryError {}

// ---------------------------------------------------------------------------
// Registry trait
// ---------------------------------------------------------------------------

/// External model-registry contract consumed by the promotion workflows.
///
/// Implementations must be object-safe so workflows can hold a
/// `&mut dyn ModelRegistry` without knowing the concrete backend.
///
/// Alias writes are last-writer-wins; no transaction wraps a multi-step alias
/// swap. The workflows assume at most one invocation runs at a time against a
/// given model name.
pub trait ModelRegistry {
    /// Human-readable backend name (e.g. `"file"`, `"mem"`).
    fn backend(&self) -> &'static str;

    /// Create a new version under `name` and return its version number.
    /// Versions are monotonic per model name and never reused.
    fn register(
        &mut self,
        name: &str,
        run_id: Uuid,
        tags: &Tags,
        description: &str,
    ) -> Result<i64, RegistryError>;

    /// Resolve the entry currently holding `alias`, or `NotFound`.
    fn get_by_alias(&self, name: &str, alias: Alias) -> Result<RegistryEntry, RegistryError>;

    /// Point `alias` at `version`. Reassigning an alias held by another
    /// version moves it (last-writer-wins).
    fn set_alias(&mut self, name: &str, alias: Alias, version: i64) -> Result<(), RegistryError>;

    /// Remove `alias` from the model. Idempotent: deleting an absent alias is
    /// a no-op.
    fn delete_alias(&mut self, name: &str, alias: Alias) -> Result<(), RegistryError>;

    /// Replace the description text of an existing version.
    fn update_description(
        &mut self,
        name: &str,
        version: i64,
        text: &str,
    ) -> Result<(), RegistryError>;

    /// All versions registered under `name`, ascending by version number.
    /// An unknown model name yields an empty list, not an error.
    fn search_versions(&self, name: &str) -> Result<Vec<RegistryEntry>, RegistryError>;

    /// Administrative: delete every version and alias of `name`.
    /// Returns the number of versions removed. Never called by the workflows.
    fn delete_model(&mut self, name: &str) -> Result<usize, RegistryError>;
}
