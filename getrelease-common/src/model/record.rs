// getrelease-common/src/model/record.rs
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::release::LATEST_TAG;

/// Persisted state of one installed utility.
///
/// `symlinks` maps each binary to the symlink created for it in the bin
/// directory; every key is also a member of `binaries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationRecord {
    pub name: String,
    /// `owner/repo`; `None` when installed from a raw URL.
    pub repo: Option<String>,
    /// Concrete tag that was installed.
    pub tag: String,
    /// Tag as the user asked for it (`"latest"` or a pinned tag).
    pub requested_tag: String,
    pub asset_url: String,
    pub binaries: BTreeSet<PathBuf>,
    pub symlinks: BTreeMap<PathBuf, PathBuf>,
    pub installed_at: DateTime<Utc>,
    #[serde(default)]
    pub asset_pattern: Option<String>,
    #[serde(default)]
    pub bin_pattern: Option<String>,
    #[serde(default)]
    pub symlink_alias: Option<String>,
    #[serde(default)]
    pub asset_path: Option<PathBuf>,
    #[serde(default)]
    pub extract_dir: Option<PathBuf>,
}

impl InstallationRecord {
    /// Whether `update` should re-resolve this record.
    ///
    /// Returns the reason when it should not.
    pub fn update_block_reason(&self) -> Option<String> {
        if self.repo.is_none() {
            return Some("installed from a URL".to_string());
        }
        if self.requested_tag != LATEST_TAG {
            return Some(format!("pinned to tag '{}'", self.requested_tag));
        }
        None
    }

    pub fn symlink_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.symlinks.values()
    }

    /// Symlinks that are missing or no longer point at one of `binaries`.
    pub fn broken_links(&self) -> Vec<PathBuf> {
        self.symlinks
            .iter()
            .filter(|(binary, link)| !link_points_at(link, binary) || !self.binaries.contains(*binary))
            .map(|(_, link)| link.clone())
            .collect()
    }

    pub fn is_healthy(&self) -> bool {
        self.broken_links().is_empty()
    }
}

fn link_points_at(link: &Path, binary: &Path) -> bool {
    match fs::symlink_metadata(link) {
        Ok(meta) if meta.file_type().is_symlink() => match fs::read_link(link) {
            Ok(target) => {
                let resolved = if target.is_relative() {
                    link.parent().map(|p| p.join(&target)).unwrap_or(target)
                } else {
                    target
                };
                resolved == binary && binary.is_file()
            }
            Err(_) => false,
        },
        _ => false,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::symlink;

    use super::*;

    fn record(bin: &Path, link: &Path) -> InstallationRecord {
        InstallationRecord {
            name: "tool".to_string(),
            repo: Some("owner/tool".to_string()),
            tag: "v1.0.0".to_string(),
            requested_tag: "latest".to_string(),
            asset_url: "https://example.com/tool.tar.gz".to_string(),
            binaries: BTreeSet::from([bin.to_path_buf()]),
            symlinks: BTreeMap::from([(bin.to_path_buf(), link.to_path_buf())]),
            installed_at: Utc::now(),
            asset_pattern: None,
            bin_pattern: None,
            symlink_alias: None,
            asset_path: None,
            extract_dir: None,
        }
    }

    #[test]
    fn healthy_when_link_points_at_binary() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("tool-bin");
        let link = dir.path().join("tool");
        fs::write(&bin, b"#!/bin/sh\n").unwrap();
        symlink(&bin, &link).unwrap();
        assert!(record(&bin, &link).is_healthy());
    }

    #[test]
    fn broken_when_link_missing_or_retargeted() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("tool-bin");
        let other = dir.path().join("other");
        let link = dir.path().join("tool");
        fs::write(&bin, b"a").unwrap();
        fs::write(&other, b"b").unwrap();

        let rec = record(&bin, &link);
        assert_eq!(rec.broken_links(), vec![link.clone()]);

        symlink(&other, &link).unwrap();
        assert!(!rec.is_healthy());
    }

    #[test]
    fn update_block_reasons() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = record(&dir.path().join("a"), &dir.path().join("b"));
        assert_eq!(rec.update_block_reason(), None);
        rec.requested_tag = "v1.0.0".to_string();
        assert!(rec.update_block_reason().unwrap().contains("pinned"));
        rec.repo = None;
        assert!(rec.update_block_reason().unwrap().contains("URL"));
    }
}
