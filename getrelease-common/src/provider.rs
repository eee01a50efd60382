// getrelease-common/src/provider.rs
//! Interfaces of the collaborators the installer drives: release metadata,
//! downloads, confirmation and progress reporting.
use std::path::Path;

use crate::error::Result;
use crate::model::{Release, RepoId, RepoInfo};

/// Source of repository and release metadata (GitHub, GitLab, test fakes).
#[allow(async_fn_in_trait)]
pub trait MetadataProvider {
    async fn repo_info(&self, repo: &RepoId) -> Result<RepoInfo>;

    /// `tag` may be `"latest"` or a pre-release alias; the returned release
    /// always carries the concrete tag.
    async fn release(&self, repo: &RepoId, tag: &str) -> Result<Release>;
}

#[allow(async_fn_in_trait)]
pub trait AssetFetcher {
    /// Downloads `url` to `dest`, returning the number of bytes written.
    ///
    /// Implementations must never leave a partially written file at `dest`.
    async fn fetch(&self, url: &str, dest: &Path, progress: &dyn ProgressReporter) -> Result<u64>;

    async fn fetch_text(&self, url: &str) -> Result<String>;
}

pub trait ConfirmPrompt {
    fn confirm(&self, message: &str) -> Result<bool>;
}

/// Prompt used for `--yes`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysConfirm;

impl ConfirmPrompt for AlwaysConfirm {
    fn confirm(&self, _message: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Purely observational download progress.
pub trait ProgressReporter {
    fn on_start(&self, _name: &str, _total: Option<u64>) {}
    fn on_progress(&self, done: u64, total: Option<u64>);
    fn on_finish(&self) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn on_progress(&self, _done: u64, _total: Option<u64>) {}
}
