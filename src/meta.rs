// src/meta.rs

//! Persistent per-source records: content hash, outputs, and dependency
//! edges for every build config. One JSON file per source id under
//! `<build_dir>/meta/`, named by the blake3 of the id so arbitrary ids never
//! produce hostile paths.
//!
//! The store is deliberately fail-safe: a missing or unreadable record is
//! treated as "never built" and the next build overwrites it.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::build::SerializedBuildDependency;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::hash;

/// What one build config produced from a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MetaBuild {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<SerializedBuildDependency>,
}

/// Everything remembered about one source id between runs, keyed by build
/// config name.
///
/// Record file names are hashes, so the id is repeated inside the record to
/// let [`MetaStore::load_all`] key the map it returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_id: String,
    pub content_hash: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub builds: BTreeMap<String, MetaBuild>,
}

impl SourceMeta {
    pub fn new(content_hash: impl Into<String>) -> Self {
        Self {
            source_id: String::new(),
            content_hash: content_hash.into(),
            builds: BTreeMap::new(),
        }
    }

    /// Hash equality is the sole staleness signal; mtimes are never consulted.
    pub fn is_up_to_date(&self, content_hash: &str) -> bool {
        self.content_hash == content_hash
    }
}

#[derive(Debug, Clone)]
pub struct MetaStore {
    fs: Arc<dyn FileSystem>,
    dir: PathBuf,
}

impl MetaStore {
    pub fn new(fs: Arc<dyn FileSystem>, dir: PathBuf) -> Self {
        Self { fs, dir }
    }

    pub fn record_path(&self, source_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", hash::hash_str(source_id)))
    }

    /// Loads the record for `source_id`. Missing, unreadable, or corrupt
    /// records all come back as `None`; the caller rebuilds and the next
    /// [`MetaStore::save`] replaces whatever was there.
    pub fn load(&self, source_id: &str) -> Option<SourceMeta> {
        let path = self.record_path(source_id);
        if !self.fs.exists(&path) {
            return None;
        }
        let bytes = match self.fs.read_file(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(source = %source_id, error = %e, "unreadable meta record, rebuilding");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(meta) => Some(meta),
            Err(e) => {
                warn!(source = %source_id, error = %e, "corrupt meta record, rebuilding");
                None
            }
        }
    }

    /// Loads every record in the store, keyed by source id. Corrupt entries
    /// are skipped the same way [`MetaStore::load`] skips them.
    pub fn load_all(&self) -> BTreeMap<String, SourceMeta> {
        let mut records = BTreeMap::new();
        let entries = match self.fs.read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return records,
        };
        for path in entries {
            let bytes = match self.fs.read_file(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "unreadable meta record, skipping");
                    continue;
                }
            };
            match serde_json::from_slice::<SourceMeta>(&bytes) {
                Ok(meta) if !meta.source_id.is_empty() => {
                    records.insert(meta.source_id.clone(), meta);
                }
                Ok(_) => {
                    warn!(path = %path.display(), "meta record without source id, skipping");
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt meta record, skipping");
                }
            }
        }
        records
    }

    pub fn save(&self, source_id: &str, meta: &SourceMeta) -> Result<()> {
        let mut record = meta.clone();
        record.source_id = source_id.to_string();
        let bytes = serde_json::to_vec_pretty(&record)?;
        self.fs.write_file(&self.record_path(source_id), &bytes)?;
        Ok(())
    }

    /// Removes the record. Deleting a record that never existed is fine.
    pub fn delete(&self, source_id: &str) -> Result<()> {
        self.fs.remove(&self.record_path(source_id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildDependency;
    use crate::fs::mock::MockFileSystem;

    fn store() -> (MetaStore, Arc<MockFileSystem>) {
        let mock = Arc::new(MockFileSystem::new());
        let fs: Arc<dyn FileSystem> = Arc::clone(&mock) as Arc<dyn FileSystem>;
        (MetaStore::new(fs, PathBuf::from("/build/meta")), mock)
    }

    fn sample_meta() -> SourceMeta {
        let mut meta = SourceMeta::new("abc123");
        meta.builds.insert(
            "browser".to_string(),
            MetaBuild {
                outputs: vec!["src/app.ts".to_string()],
                dependencies: vec![
                    BuildDependency::internal("src/app.ts", "./util.ts")
                        .to_serialized("src/app.ts"),
                ],
            },
        );
        meta
    }

    #[test]
    fn save_then_load_round_trips() {
        let (store, _) = store();
        let meta = sample_meta();
        store.save("src/app.ts", &meta).unwrap();
        let loaded = store.load("src/app.ts").unwrap();
        assert_eq!(loaded.source_id, "src/app.ts");
        assert_eq!(loaded.content_hash, meta.content_hash);
        assert_eq!(loaded.builds, meta.builds);
    }

    #[test]
    fn load_all_keys_by_source_id_and_skips_corrupt() {
        let (store, mock) = store();
        store.save("src/app.ts", &sample_meta()).unwrap();
        store.save("src/util.ts", &SourceMeta::new("def456")).unwrap();
        mock.add_file("/build/meta/junk.json", "{not json");

        let records = store.load_all();
        assert_eq!(
            records.keys().collect::<Vec<_>>(),
            vec!["src/app.ts", "src/util.ts"]
        );
        assert_eq!(records["src/util.ts"].content_hash, "def456");
    }

    #[test]
    fn missing_record_is_none() {
        let (store, _) = store();
        assert_eq!(store.load("src/nothing.ts"), None);
    }

    #[test]
    fn corrupt_record_is_none() {
        let (store, mock) = store();
        mock.add_file(store.record_path("src/app.ts"), "{not json");
        assert_eq!(store.load("src/app.ts"), None);
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let (store, mock) = store();
        mock.add_file(
            store.record_path("src/app.ts"),
            r#"{"content_hash":"h","future_field":42}"#,
        );
        assert_eq!(store.load("src/app.ts"), Some(SourceMeta::new("h")));
    }

    #[test]
    fn delete_is_idempotent() {
        let (store, _) = store();
        store.save("src/app.ts", &sample_meta()).unwrap();
        store.delete("src/app.ts").unwrap();
        store.delete("src/app.ts").unwrap();
        assert_eq!(store.load("src/app.ts"), None);
    }

    #[test]
    fn record_path_is_hash_of_id() {
        let (store, _) = store();
        let path = store.record_path("src/app.ts");
        assert_eq!(
            path,
            PathBuf::from(format!("/build/meta/{}.json", hash::hash_str("src/app.ts")))
        );
    }
}
