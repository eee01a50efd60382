// getrelease-core/src/link.rs
//! Transactional symlink creation in the user's bin directory.
//!
//! Every link path is validated before anything is touched. Links created
//! (and tool-owned links replaced) are tracked by a [`LinkSet`] that undoes
//! them on drop unless committed.
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use getrelease_common::error::{GrError, Result};
use tracing::{debug, error, warn};

#[cfg(unix)]
fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

fn link_err(path: &Path, reason: impl Into<String>) -> GrError {
    GrError::LinkError {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Target of `link` when it is a symlink pointing under `data_dir`.
pub fn owned_link_target(link: &Path, data_dir: &Path) -> Option<PathBuf> {
    let meta = link.symlink_metadata().ok()?;
    if !meta.file_type().is_symlink() {
        return None;
    }
    let target = fs::read_link(link).ok()?;
    let absolute = match link.parent() {
        Some(parent) if target.is_relative() => parent.join(&target),
        _ => target.clone(),
    };
    normalize(&absolute).starts_with(data_dir).then_some(target)
}

/// Resolves `.` and `..` lexically, without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Links created by one install, rolled back on drop unless committed.
#[derive(Debug)]
pub struct LinkSet {
    created: Vec<PathBuf>,
    /// Link path → target it had before being replaced.
    replaced: Vec<(PathBuf, PathBuf)>,
    committed: bool,
}

impl LinkSet {
    /// Creates `link → binary` for every entry of `plan`, or nothing at all.
    ///
    /// Existing paths are replaced only when they are symlinks into
    /// `data_dir`; a regular file, directory or foreign symlink blocks the
    /// whole set.
    pub fn create(plan: &BTreeMap<PathBuf, PathBuf>, data_dir: &Path) -> Result<Self> {
        let mut to_replace = Vec::new();
        for (binary, link) in plan {
            if !binary.is_file() {
                return Err(link_err(
                    link,
                    format!("binary {} does not exist", binary.display()),
                ));
            }
            if link.symlink_metadata().is_err() {
                continue;
            }
            match owned_link_target(link, data_dir) {
                Some(old) => to_replace.push((link.clone(), old)),
                None => {
                    return Err(link_err(
                        link,
                        "path exists and was not created by getrelease; remove it or choose --symlink-alias",
                    ))
                }
            }
        }

        let mut set = Self {
            created: Vec::with_capacity(plan.len()),
            replaced: Vec::new(),
            committed: false,
        };
        if let Some(parent) = plan.values().next().and_then(|l| l.parent()) {
            fs::create_dir_all(parent)
                .map_err(|e| link_err(parent, format!("cannot create bin directory: {e}")))?;
        }

        for (binary, link) in plan {
            if let Some(pos) = to_replace.iter().position(|(l, _)| l == link) {
                let entry = to_replace.swap_remove(pos);
                fs::remove_file(link)
                    .map_err(|e| link_err(link, format!("cannot replace old symlink: {e}")))?;
                debug!("Replaced symlink {} (was -> {})", link.display(), entry.1.display());
                set.replaced.push(entry);
            }
            make_symlink(binary, link).map_err(|e| link_err(link, e.to_string()))?;
            debug!("Linked {} -> {}", link.display(), binary.display());
            set.created.push(link.clone());
        }
        Ok(set)
    }

    pub fn links(&self) -> &[PathBuf] {
        &self.created
    }

    /// Keeps the links.
    pub fn commit(mut self) {
        self.committed = true;
    }

    fn rollback(&mut self) {
        for link in self.created.drain(..).rev() {
            if let Err(e) = fs::remove_file(&link) {
                warn!("Rollback could not remove {}: {}", link.display(), e);
            }
        }
        for (link, old_target) in self.replaced.drain(..) {
            if let Err(e) = make_symlink(&old_target, &link) {
                error!(
                    "Rollback could not restore {} -> {}: {}",
                    link.display(),
                    old_target.display(),
                    e
                );
            }
        }
    }
}

impl Drop for LinkSet {
    fn drop(&mut self) {
        if !self.committed && (!self.created.is_empty() || !self.replaced.is_empty()) {
            debug!("Rolling back {} symlink(s)", self.created.len());
            self.rollback();
        }
    }
}

/// Deletes each symlink that points into `data_dir`; missing paths count as
/// removed. Anything else is left alone and reported.
pub fn remove_links<'a>(
    links: impl IntoIterator<Item = &'a PathBuf>,
    data_dir: &Path,
) -> Vec<(PathBuf, String)> {
    let mut failures = Vec::new();
    for link in links {
        match link.symlink_metadata() {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Symlink {} already gone", link.display());
            }
            Err(e) => failures.push((link.clone(), e.to_string())),
            Ok(meta) if !meta.file_type().is_symlink() => {
                failures.push((link.clone(), "not a symlink; left in place".to_string()));
            }
            Ok(_) if owned_link_target(link, data_dir).is_none() => {
                failures.push((
                    link.clone(),
                    format!("points outside {}; left in place", data_dir.display()),
                ));
            }
            Ok(_) => match fs::remove_file(link) {
                Ok(()) => debug!("Removed symlink {}", link.display()),
                Err(e) => failures.push((link.clone(), e.to_string())),
            },
        }
    }
    failures
}
