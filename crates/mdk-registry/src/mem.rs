use uuid::Uuid;

use crate::registry::{ModelRegistry, RegistryError};
use crate::store::RegistryDoc;
use crate::types::{Alias, RegistryEntry, Tags};

/// Deterministic in-memory registry for tests and scenario wiring.
///
/// No persistence, no timestamps beyond entry creation, BTreeMap-backed so
/// listing order is stable across runs.
#[derive(Debug, Clone, Default)]
pub struct MemRegistry {
    doc: RegistryDoc,
}

impl MemRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModelRegistry for MemRegistry {
    fn backend(&self) -> &'static str {
        "mem"
    }

    fn register(
        &mut self,
        name: &str,
        run_id: Uuid,
        tags: &Tags,
        description: &str,
    ) -> Result<i64, RegistryError> {
        Ok(self.doc.register(name, run_id, tags, description))
    }

    fn get_by_alias(&self, name: &str, alias: Alias) -> Result<RegistryEntry, RegistryError> {
        self.doc.get_by_alias(name, alias)
    }

    fn set_alias(&mut self, name: &str, alias: Alias, version: i64) -> Result<(), RegistryError> {
        self.doc.set_alias(name, alias, version)
    }

    fn delete_alias(&mut self, name: &str, alias: Alias) -> Result<(), RegistryError> {
        self.doc.delete_alias(name, alias);
        Ok(())
    }

    fn update_description(
        &mut self,
        name: &str,
        version: i64,
        text: &str,
    ) -> Result<(), RegistryError> {
        self.doc.update_description(name, version, text)
    }

    fn search_versions(&self, name: &str) -> Result<Vec<RegistryEntry>, RegistryError> {
        Ok(self.doc.search_versions(name))
    }

    fn delete_model(&mut self, name: &str) -> Result<usize, RegistryError> {
        Ok(self.doc.delete_model(name))
    }
}
