// getrelease-core/src/locate.rs
//! Finds the executables inside an extracted asset and decides the names
//! they are exposed under in the bin directory.
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use getrelease_common::error::{GrError, Result};
use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use crate::platform::PlatformFingerprint;

#[cfg(unix)]
fn is_executable(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &std::fs::Metadata) -> bool {
    true
}

/// Every executable regular file under `dir` whose path relative to `dir`
/// matches `bin_pattern` (everything when `None`).
pub fn locate(dir: &Path, bin_pattern: Option<&str>) -> Result<BTreeSet<PathBuf>> {
    let pattern = bin_pattern.map(str::trim).filter(|p| !p.is_empty());
    let re = pattern.map(Regex::new).transpose()?;

    let mut found = BTreeSet::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(|e| {
            GrError::Generic(format!("Failed to walk {}: {}", dir.display(), e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let meta = entry.metadata().map_err(|e| {
            GrError::Generic(format!("Failed to stat {}: {}", entry.path().display(), e))
        })?;
        if !is_executable(&meta) {
            continue;
        }
        let rel = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        let rel = rel.to_string_lossy().replace('\\', "/");
        if re.as_ref().is_some_and(|re| !re.is_match(&rel)) {
            debug!("Skipping executable {} (does not match bin pattern)", rel);
            continue;
        }
        found.insert(entry.path().to_path_buf());
    }

    if found.is_empty() {
        return Err(GrError::NoBinaryFound {
            dir: dir.to_path_buf(),
            pattern: pattern.unwrap_or(".*").to_string(),
        });
    }
    debug!("Located binaries: {:?}", found);
    Ok(found)
}

fn validate_link_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(GrError::Validation(format!(
            "'{name}' is not a valid symlink name"
        )));
    }
    Ok(())
}

/// Maps each binary to the symlink path it gets inside `bin_dir`.
///
/// A single binary is named by `alias`, or by `repo_name` when its own file
/// name carries a platform token (`tool-linux-amd64` → `tool`). Several
/// binaries keep their file names and reject an alias.
pub fn link_plan(
    binaries: &BTreeSet<PathBuf>,
    bin_dir: &Path,
    alias: Option<&str>,
    repo_name: Option<&str>,
    fingerprint: &PlatformFingerprint,
) -> Result<BTreeMap<PathBuf, PathBuf>> {
    let file_name = |p: &Path| {
        p.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    };

    if let [only] = binaries.iter().collect::<Vec<_>>().as_slice() {
        let own = file_name(only.as_path());
        let name = match (alias, repo_name) {
            (Some(alias), _) => alias.to_string(),
            (None, Some(repo)) if fingerprint.mentions_platform(&own) => {
                debug!("Binary name '{}' carries platform tokens; linking as '{}'", own, repo);
                repo.to_string()
            }
            _ => own,
        };
        validate_link_name(&name)?;
        return Ok(BTreeMap::from([((*only).clone(), bin_dir.join(name))]));
    }

    if let Some(alias) = alias {
        return Err(GrError::AmbiguousAlias {
            alias: alias.to_string(),
            binaries: binaries.iter().cloned().collect(),
        });
    }

    let mut plan = BTreeMap::new();
    let mut seen: BTreeMap<PathBuf, &PathBuf> = BTreeMap::new();
    for binary in binaries {
        let name = file_name(binary.as_path());
        validate_link_name(&name)?;
        let link = bin_dir.join(&name);
        if let Some(first) = seen.insert(link.clone(), binary) {
            return Err(GrError::LinkError {
                path: link,
                reason: format!(
                    "both {} and {} would be linked under this name",
                    first.display(),
                    binary.display()
                ),
            });
        }
        plan.insert(binary.clone(), link);
    }
    Ok(plan)
}
