//! Model-registry boundary for the promotion workflows.
//!
//! This crate defines the entry/alias types, the error taxonomy, and the
//! [`ModelRegistry`] trait that the gate and promotion workflows are written
//! against. Two implementations ship here:
//!
//! - [`FileRegistry`] — whole-state JSON document on disk, rewritten
//!   atomically after every mutation. The default backend for the CLI.
//! - [`MemRegistry`] — deterministic in-memory registry for tests and
//!   scenario wiring.
//!
//! No promotion rules, no criteria, no CLI logic belong here.

mod file;
mod mem;
mod registry;
mod store;
mod types;

pub use file::FileRegistry;
pub use mem::MemRegistry;
pub use registry::{ModelRegistry, RegistryError};
pub use types::{Alias, RegistryEntry, Tags};
