use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::registry::{ModelRegistry, RegistryError};
use crate::store::{RegistryDoc, SCHEMA_VERSION};
use crate::types::{Alias, RegistryEntry, Tags};

/// JSON-file-backed registry.
///
/// The whole registry state lives in one pretty-printed JSON document. Every
/// mutation rewrites the file atomically (write to a sibling temp file, then
/// rename), so a crash mid-write never leaves a truncated document behind.
///
/// This backend assumes a single process mutates the file at a time; there is
/// no file locking (accepted limitation, same as the alias-swap race).
#[derive(Debug)]
pub struct FileRegistry {
    path: PathBuf,
    doc: RegistryDoc,
}

impl FileRegistry {
    /// Open an existing registry file, or start an empty registry if the file
    /// does not exist yet (it is created on first mutation).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref().to_path_buf();
        if path.as_os_str().is_empty() {
            return Err(RegistryError::Config("empty registry path".to_string()));
        }

        let doc = if path.exists() {
            let raw = fs::read_to_string(&path)
                .map_err(|e| RegistryError::Io(format!("read {}: {e}", path.display())))?;
            let doc: RegistryDoc = serde_json::from_str(&raw)
                .map_err(|e| RegistryError::Decode(format!("parse {}: {e}", path.display())))?;
            if doc.schema_version != SCHEMA_VERSION {
                return Err(RegistryError::Decode(format!(
                    "unsupported registry schema_version={} (expected {})",
                    doc.schema_version, SCHEMA_VERSION
                )));
            }
            doc
        } else {
            RegistryDoc::default()
        };

        Ok(Self { path, doc })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomic rewrite: temp file in the same directory, then rename over.
    fn save(&self) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| RegistryError::Io(format!("create_dir_all {}: {e}", parent.display())))?;
            }
        }
        let json = serde_json::to_string_pretty(&self.doc)
            .map_err(|e| RegistryError::Decode(format!("serialize registry: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .map_err(|e| RegistryError::Io(format!("write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| RegistryError::Io(format!("rename {}: {e}", self.path.display())))?;
        Ok(())
    }
}

impl ModelRegistry for FileRegistry {
    fn backend(&self) -> &'static str {
        "file"
    }

    fn register(
        &mut self,
        name: &str,
        run_id: Uuid,
        tags: &Tags,
        description: &str,
    ) -> Result<i64, RegistryError> {
        let version = self.doc.register(name, run_id, tags, description);
        self.save()?;
        debug!(model = name, version, "registered model version");
        Ok(version)
    }

    fn get_by_alias(&self, name: &str, alias: Alias) -> Result<RegistryEntry, RegistryError> {
        self.doc.get_by_alias(name, alias)
    }

    fn set_alias(&mut self, name: &str, alias: Alias, version: i64) -> Result<(), RegistryError> {
        self.doc.set_alias(name, alias, version)?;
        self.save()?;
        debug!(model = name, alias = alias.as_str(), version, "alias set");
        Ok(())
    }

    fn delete_alias(&mut self, name: &str, alias: Alias) -> Result<(), RegistryError> {
        self.doc.delete_alias(name, alias);
        self.save()?;
        debug!(model = name, alias = alias.as_str(), "alias deleted");
        Ok(())
    }

    fn update_description(
        &mut self,
        name: &str,
        version: i64,
        text: &str,
    ) -> Result<(), RegistryError> {
        self.doc.update_description(name, version, text)?;
        self.save()
    }

    fn search_versions(&self, name: &str) -> Result<Vec<RegistryEntry>, RegistryError> {
        Ok(self.doc.search_versions(name))
    }

    fn delete_model(&mut self, name: &str) -> Result<usize, RegistryError> {
        let removed = self.doc.delete_model(name);
        if removed > 0 {
            self.save()?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn tags() -> Tags {
        BTreeMap::from([
            ("provider".to_string(), "anthropic".to_string()),
            ("category_accuracy".to_string(), "0.9200".to_string()),
        ])
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");

        let run_id = Uuid::new_v4();
        {
            let mut reg = FileRegistry::open(&path).unwrap();
            let v = reg
                .register("news_classifier", run_id, &tags(), "first champion")
                .unwrap();
            reg.set_alias("news_classifier", Alias::Champion, v).unwrap();
        }

        let reg = FileRegistry::open(&path).unwrap();
        let champ = reg
            .get_by_alias("news_classifier", Alias::Champion)
            .unwrap();
        assert_eq!(champ.version, 1);
        assert_eq!(champ.run_id, run_id);
        assert_eq!(champ.description, "first champion");
        assert_eq!(champ.aliases, vec![Alias::Champion]);
    }

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let reg = FileRegistry::open(dir.path().join("absent.json")).unwrap();
        assert!(reg.search_versions("anything").unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        fs::write(&path, "{not json").unwrap();

        let err = FileRegistry::open(&path).unwrap_err();
        assert!(matches!(err, RegistryError::Decode(_)), "got: {err}");
    }

    #[test]
    fn no_tmp_file_left_behind_after_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        let mut reg = FileRegistry::open(&path).unwrap();
        reg.register("m", Uuid::new_v4(), &tags(), "").unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }
}
