//! Shared in-memory registry state. `FileRegistry` wraps this with disk
//! persistence; `MemRegistry` exposes it directly.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::registry::RegistryError;
use crate::types::{Alias, RegistryEntry, Tags};

pub(crate) const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RegistryDoc {
    pub schema_version: u32,
    /// Model name -> model state. BTreeMap keeps serialization deterministic.
    pub models: BTreeMap<String, ModelDoc>,
}

impl Default for RegistryDoc {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            models: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct ModelDoc {
    /// Next version number to hand out; versions are never reused.
    pub next_version: i64,
    /// Alias string -> version. One version per alias by construction.
    pub aliases: BTreeMap<String, i64>,
    /// Ascending by version.
    pub versions: Vec<VersionDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct VersionDoc {
    pub version: i64,
    pub run_id: Uuid,
    pub tags: Tags,
    pub description: String,
    pub created_at_utc: DateTime<Utc>,
}

impl RegistryDoc {
    pub fn register(&mut self, name: &str, run_id: Uuid, tags: &Tags, description: &str) -> i64 {
        let model = self.models.entry(name.to_string()).or_default();
        if model.next_version < 1 {
            model.next_version = 1;
        }
        let version = model.next_version;
        model.next_version += 1;
        model.versions.push(VersionDoc {
            version,
            run_id,
            tags: tags.clone(),
            description: description.to_string(),
            created_at_utc: Utc::now(),
        });
        version
    }

    pub fn get_by_alias(&self, name: &str, alias: Alias) -> Result<RegistryEntry, RegistryError> {
        let model = self
            .models
            .get(name)
            .ok_or_else(|| RegistryError::not_found(name, format!("alias={alias}")))?;
        let version = model
            .aliases
            .get(alias.as_str())
            .copied()
            .ok_or_else(|| RegistryError::not_found(name, format!("alias={alias}")))?;
        self.entry(name, model, version)
    }

    pub fn set_alias(
        &mut self,
        name: &str,
        alias: Alias,
        version: i64,
    ) -> Result<(), RegistryError> {
        let model = self
            .models
            .get_mut(name)
            .ok_or_else(|| RegistryError::not_found(name, format!("version={version}")))?;
        if !model.versions.iter().any(|v| v.version == version) {
            return Err(RegistryError::not_found(name, format!("version={version}")));
        }
        model.aliases.insert(alias.as_str().to_string(), version);
        Ok(())
    }

    pub fn delete_alias(&mut self, name: &str, alias: Alias) {
        if let Some(model) = self.models.get_mut(name) {
            model.aliases.remove(alias.as_str());
        }
    }

    pub fn update_description(
        &mut self,
        name: &str,
        version: i64,
        text: &str,
    ) -> Result<(), RegistryError> {
        let model = self
            .models
            .get_mut(name)
            .ok_or_else(|| RegistryError::not_found(name, format!("version={version}")))?;
        let doc = model
            .versions
            .iter_mut()
            .find(|v| v.version == version)
            .ok_or_else(|| RegistryError::not_found(name, format!("version={version}")))?;
        doc.description = text.to_string();
        Ok(())
    }

    pub fn search_versions(&self, name: &str) -> Vec<RegistryEntry> {
        let Some(model) = self.models.get(name) else {
            return Vec::new();
        };
        model
            .versions
            .iter()
            .map(|v| assemble_entry(model, v))
            .collect()
    }

    pub fn delete_model(&mut self, name: &str) -> usize {
        self.models
            .remove(name)
            .map(|m| m.versions.len())
            .unwrap_or(0)
    }

    fn entry(
        &self,
        name: &str,
        model: &ModelDoc,
        version: i64,
    ) -> Result<RegistryEntry, RegistryError> {
        model
            .versions
            .iter()
            .find(|v| v.version == version)
            .map(|v| assemble_entry(model, v))
            .ok_or_else(|| RegistryError::not_found(name, format!("version={version}")))
    }
}

fn assemble_entry(model: &ModelDoc, doc: &VersionDoc) -> RegistryEntry {
    let mut aliases: Vec<Alias> = model
        .aliases
        .iter()
        .filter(|(_, v)| **v == doc.version)
        .filter_map(|(a, _)| a.parse().ok())
        .collect();
    aliases.sort();
    RegistryEntry {
        version: doc.version,
        run_id: doc.run_id,
        tags: doc.tags.clone(),
        description: doc.description.clone(),
        aliases,
        created_at_utc: doc.created_at_utc,
    }
}
