// getrelease-core/src/store.rs
//! The install-state store: every installation record, keyed by name, kept
//! in one JSON document that is read whole and rewritten atomically.
//!
//! Concurrent getrelease processes are not coordinated; the last writer wins.
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use getrelease_common::error::{GrError, Result};
use getrelease_common::fs::write_json_atomic;
use getrelease_common::model::InstallationRecord;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const STORE_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    version: u32,
    records: BTreeMap<String, InstallationRecord>,
}

#[derive(Debug)]
pub struct InstallStore {
    /// `None` for a store that only lives in memory.
    path: Option<PathBuf>,
    records: BTreeMap<String, InstallationRecord>,
}

impl InstallStore {
    /// Loads the store at `path`; a missing file is an empty store.
    pub fn open(path: &Path) -> Result<Self> {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No install store at {}; starting empty", path.display());
                return Ok(Self {
                    path: Some(path.to_path_buf()),
                    records: BTreeMap::new(),
                });
            }
            Err(e) => {
                return Err(GrError::StoreCorruption {
                    path: path.to_path_buf(),
                    reason: format!("cannot read: {e}"),
                })
            }
        };
        let doc: StoreDocument =
            serde_json::from_slice(&raw).map_err(|e| GrError::StoreCorruption {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        if doc.version > STORE_VERSION {
            return Err(GrError::StoreCorruption {
                path: path.to_path_buf(),
                reason: format!(
                    "written by a newer getrelease (store version {})",
                    doc.version
                ),
            });
        }
        if let Some((key, record)) = doc.records.iter().find(|(k, r)| **k != r.name) {
            return Err(GrError::StoreCorruption {
                path: path.to_path_buf(),
                reason: format!("entry '{}' holds a record named '{}'", key, record.name),
            });
        }
        debug!(
            "Loaded {} installation record(s) from {}",
            doc.records.len(),
            path.display()
        );
        Ok(Self {
            path: Some(path.to_path_buf()),
            records: doc.records,
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&InstallationRecord> {
        self.records.get(name)
    }

    /// Inserts or replaces the record with the same name and persists.
    pub fn put(&mut self, record: InstallationRecord) -> Result<()> {
        let name = record.name.clone();
        let previous = self.records.insert(name.clone(), record);
        if let Err(e) = self.persist() {
            match previous {
                Some(prev) => self.records.insert(name, prev),
                None => self.records.remove(&name),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Removes and returns the record, persisting only if one existed.
    pub fn delete(&mut self, name: &str) -> Result<Option<InstallationRecord>> {
        let Some(removed) = self.records.remove(name) else {
            return Ok(None);
        };
        if let Err(e) = self.persist() {
            self.records.insert(name.to_string(), removed);
            return Err(e);
        }
        Ok(Some(removed))
    }

    /// All records, ordered by name.
    pub fn list(&self) -> Vec<&InstallationRecord> {
        self.records.values().collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let doc = StoreDocument {
            version: STORE_VERSION,
            records: self.records.clone(),
        };
        write_json_atomic(path, &doc).map_err(|e| {
            warn!("Failed to write install store {}: {}", path.display(), e);
            e
        })?;
        debug!("Wrote {} record(s) to {}", self.records.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    use super::*;

    fn record(name: &str) -> InstallationRecord {
        let binary = PathBuf::from(format!("/data/{name}/bin/{name}"));
        InstallationRecord {
            name: name.to_string(),
            repo: Some(format!("owner/{name}")),
            tag: "v1.2.3".to_string(),
            requested_tag: "latest".to_string(),
            asset_url: format!("https://github.com/owner/{name}/releases/download/v1.2.3/{name}.tar.gz"),
            binaries: BTreeSet::from([binary.clone()]),
            symlinks: BTreeMap::from([(binary, PathBuf::from(format!("/bin/{name}")))]),
            installed_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
            asset_pattern: Some("musl".to_string()),
            bin_pattern: None,
            symlink_alias: None,
            asset_path: Some(PathBuf::from(format!("/cache/{name}.tar.gz"))),
            extract_dir: Some(PathBuf::from(format!("/data/{name}"))),
        }
    }

    #[test]
    fn put_then_get_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("installed.json");
        let rec = record("tool");

        let mut store = InstallStore::open(&path).unwrap();
        assert!(store.is_empty());
        store.put(rec.clone()).unwrap();
        assert_eq!(store.get("tool"), Some(&rec));

        let reopened = InstallStore::open(&path).unwrap();
        assert_eq!(reopened.get("tool"), Some(&rec));
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn put_overwrites_same_name() {
        let mut store = InstallStore::in_memory();
        store.put(record("tool")).unwrap();
        let mut newer = record("tool");
        newer.tag = "v2.0.0".to_string();
        store.put(newer).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("tool").unwrap().tag, "v2.0.0");
    }

    #[test]
    fn delete_removes_and_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("installed.json");
        let mut store = InstallStore::open(&path).unwrap();
        store.put(record("a")).unwrap();
        store.put(record("b")).unwrap();

        assert_eq!(store.delete("a").unwrap().map(|r| r.name), Some("a".to_string()));
        assert!(store.delete("a").unwrap().is_none());
        let reopened = InstallStore::open(&path).unwrap();
        assert!(reopened.get("a").is_none());
        assert_eq!(reopened.names(), ["b"]);
    }

    #[test]
    fn list_is_sorted_by_name() {
        let mut store = InstallStore::in_memory();
        for name in ["zoxide", "bat", "fd"] {
            store.put(record(name)).unwrap();
        }
        let names: Vec<_> = store.list().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["bat", "fd", "zoxide"]);
    }

    #[test]
    fn unreadable_document_is_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("installed.json");
        fs::write(&path, b"{ not json").unwrap();
        assert!(matches!(
            InstallStore::open(&path),
            Err(GrError::StoreCorruption { .. })
        ));

        fs::write(&path, br#"{"version": 99, "records": {}}"#).unwrap();
        assert!(matches!(
            InstallStore::open(&path),
            Err(GrError::StoreCorruption { .. })
        ));
    }

    #[test]
    fn mismatched_key_is_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("installed.json");
        let doc = StoreDocument {
            version: STORE_VERSION,
            records: BTreeMap::from([("other".to_string(), record("tool"))]),
        };
        fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();
        assert!(matches!(
            InstallStore::open(&path),
            Err(GrError::StoreCorruption { .. })
        ));
    }

    #[test]
    fn failed_write_keeps_memory_consistent() {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join("state");
        let mut store = InstallStore::open(&state.join("installed.json")).unwrap();
        // The state directory is now a regular file, so every write fails.
        fs::write(&state, b"x").unwrap();
        assert!(store.put(record("tool")).is_err());
        assert!(store.get("tool").is_none());
    }
}
