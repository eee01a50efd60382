// getrelease-core/src/installer.rs
//! Sequences a whole installation:
//! `Resolving → Selecting → Confirming → Downloading → Extracting → Locating
//! → Linking → Recorded`.
//!
//! Any failure aborts before the next stage. Nothing reaches the store unless
//! every stage succeeded, and links created by a failed run are rolled back.
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use getrelease_common::config::Config;
use getrelease_common::error::{GrError, Result};
use getrelease_common::model::{
    url_file_name, InstallationRecord, Release, ReleaseAsset, RepoId, RepoInfo, LATEST_TAG,
};
use getrelease_common::provider::{
    AlwaysConfirm, AssetFetcher, ConfirmPrompt, MetadataProvider, NoProgress, ProgressReporter,
};
use getrelease_net::validation::{find_checksum, verify_checksum};
use tracing::{debug, info, warn};

use crate::extract::extract;
use crate::link::{owned_link_target, remove_links, LinkSet};
use crate::locate::{link_plan, locate};
use crate::platform::PlatformFingerprint;
use crate::select::{select, SelectionPattern};
use crate::store::InstallStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolving,
    Selecting,
    Confirming,
    Downloading,
    Extracting,
    Locating,
    Linking,
    Recorded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Resolving => "resolving",
            Stage::Selecting => "selecting",
            Stage::Confirming => "confirming",
            Stage::Downloading => "downloading",
            Stage::Extracting => "extracting",
            Stage::Locating => "locating",
            Stage::Linking => "linking",
            Stage::Recorded => "recorded",
        };
        f.write_str(s)
    }
}

/// What to install and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// `owner/repo` or a repository URL.
    pub repo_id: Option<String>,
    pub tag: String,
    /// Direct asset URL; skips release lookup and asset selection.
    pub url: Option<String>,
    /// Skip the confirmation prompt.
    pub confirm: bool,
    /// Fetch the asset (always fresh) and stop.
    pub download_only: bool,
    pub asset_pattern: Option<String>,
    pub bin_pattern: Option<String>,
    pub symlink_alias: Option<String>,
}

impl Default for InstallRequest {
    fn default() -> Self {
        Self {
            repo_id: None,
            tag: LATEST_TAG.to_string(),
            url: None,
            confirm: false,
            download_only: false,
            asset_pattern: None,
            bin_pattern: None,
            symlink_alias: None,
        }
    }
}

impl InstallRequest {
    pub fn for_repo(repo_id: impl Into<String>) -> Self {
        Self {
            repo_id: Some(repo_id.into()),
            ..Self::default()
        }
    }

    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Replays the request a record was installed with, against the latest
    /// release.
    fn from_record(record: &InstallationRecord) -> Self {
        Self {
            repo_id: record.repo.clone(),
            tag: LATEST_TAG.to_string(),
            url: None,
            confirm: false,
            download_only: false,
            asset_pattern: record.asset_pattern.clone(),
            bin_pattern: record.bin_pattern.clone(),
            symlink_alias: record.symlink_alias.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed(InstallationRecord),
    /// `download_only`: the asset is in the cache, nothing else changed.
    Downloaded { path: PathBuf, tag: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Skipped { reason: String },
    UpToDate { tag: String },
    Updated {
        from: String,
        record: InstallationRecord,
    },
}

/// Per-record results of `update_all`, in name order.
#[derive(Debug, Default)]
pub struct UpdateReport {
    pub results: Vec<(String, Result<UpdateOutcome>)>,
}

impl UpdateReport {
    pub fn failures(&self) -> impl Iterator<Item = (&str, &GrError)> {
        self.results
            .iter()
            .filter_map(|(name, r)| r.as_ref().err().map(|e| (name.as_str(), e)))
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOutcome {
    pub record: InstallationRecord,
    /// Symlinks that could not be deleted, with the reason.
    pub link_failures: Vec<(PathBuf, String)>,
    /// Files and directories deleted by `purge`.
    pub purged: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub record: InstallationRecord,
    pub broken_links: Vec<PathBuf>,
}

impl ListEntry {
    pub fn is_healthy(&self) -> bool {
        self.broken_links.is_empty()
    }
}

/// The resolved asset an install run materializes.
struct Target {
    repo: Option<RepoId>,
    tag: String,
    asset: ReleaseAsset,
    /// Every asset of the release, for checksum lookup.
    siblings: Vec<ReleaseAsset>,
}

pub struct Installer<P, F> {
    config: Config,
    provider: P,
    fetcher: F,
    prompt: Box<dyn ConfirmPrompt>,
    progress: Box<dyn ProgressReporter>,
    fingerprint: PlatformFingerprint,
}

impl<P: MetadataProvider, F: AssetFetcher> Installer<P, F> {
    pub fn new(config: Config, provider: P, fetcher: F) -> Self {
        Self {
            config,
            provider,
            fetcher,
            prompt: Box::new(AlwaysConfirm),
            progress: Box::new(NoProgress),
            fingerprint: PlatformFingerprint::detect(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl ConfirmPrompt + 'static) -> Self {
        self.prompt = Box::new(prompt);
        self
    }

    pub fn with_progress(mut self, progress: impl ProgressReporter + 'static) -> Self {
        self.progress = Box::new(progress);
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: PlatformFingerprint) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    fn enter(&self, name: &str, stage: Stage) {
        debug!("[{}] stage: {}", name, stage);
    }

    pub async fn install(
        &self,
        store: &mut InstallStore,
        req: &InstallRequest,
    ) -> Result<InstallOutcome> {
        let target = match (&req.repo_id, &req.url) {
            (_, Some(url)) => self.target_from_url(url)?,
            (Some(repo_id), None) => {
                let repo = RepoId::parse(repo_id)?;
                let release = self.resolve(&repo, &req.tag).await?;
                self.choose(repo, release, req)?
            }
            (None, None) => {
                return Err(GrError::Validation(
                    "either a repository or --url is required".to_string(),
                ))
            }
        };
        self.materialize(store, req, target).await
    }

    /// Re-installs `name` from its repository's latest release.
    pub async fn update(&self, store: &mut InstallStore, name: &str) -> Result<UpdateOutcome> {
        let record = store
            .get(name)
            .cloned()
            .ok_or_else(|| GrError::NotInstalled(name.to_string()))?;
        if let Some(reason) = record.update_block_reason() {
            debug!("Not updating {}: {}", name, reason);
            return Ok(UpdateOutcome::Skipped { reason });
        }
        let repo_id = record.repo.as_deref().unwrap_or_default();
        let repo = RepoId::parse(repo_id)?;
        let release = self.resolve(&repo, LATEST_TAG).await?;
        if release.tag == record.tag {
            info!("{} is up to date ({})", name, record.tag);
            return Ok(UpdateOutcome::UpToDate { tag: record.tag });
        }

        info!("Updating {} from {} to {}", name, record.tag, release.tag);
        let req = InstallRequest::from_record(&record);
        let target = self.choose(repo, release, &req)?;
        match self.materialize_as(store, &req, target, Some(name)).await? {
            InstallOutcome::Installed(new_record) => Ok(UpdateOutcome::Updated {
                from: record.tag,
                record: new_record,
            }),
            InstallOutcome::Downloaded { .. } => Err(GrError::Generic(format!(
                "update of {name} stopped after download"
            ))),
        }
    }

    /// Runs `update` for every record; one failure does not stop the rest.
    pub async fn update_all(&self, store: &mut InstallStore) -> UpdateReport {
        let mut report = UpdateReport::default();
        for name in store.names() {
            let result = self.update(store, &name).await;
            if let Err(e) = &result {
                warn!("Update of {} failed: {}", name, e);
            }
            report.results.push((name, result));
        }
        report
    }

    /// Deletes the record's symlinks (best effort) and the record itself;
    /// `purge` also deletes the extracted files and the cached asset.
    pub fn remove(
        &self,
        store: &mut InstallStore,
        name: &str,
        purge: bool,
    ) -> Result<RemoveOutcome> {
        let record = store
            .get(name)
            .cloned()
            .ok_or_else(|| GrError::NotInstalled(name.to_string()))?;
        let link_failures = remove_links(record.symlink_paths(), &self.config.data_dir);
        for (link, reason) in &link_failures {
            warn!("Could not remove symlink {}: {}", link.display(), reason);
        }
        store.delete(name)?;
        info!("Removed {}", name);

        let mut purged = Vec::new();
        if purge {
            let paths = [(&record.extract_dir, 1), (&record.asset_path, 2)];
            for (path, depth) in paths {
                let Some(path) = path else { continue };
                match purge_path(path) {
                    Ok(true) => {
                        prune_empty_parents(path, depth);
                        purged.push(path.clone());
                    }
                    Ok(false) => {}
                    Err(e) => warn!("Could not purge {}: {}", path.display(), e),
                }
            }
        }
        Ok(RemoveOutcome {
            record,
            link_failures,
            purged,
        })
    }

    pub fn list(&self, store: &InstallStore) -> Vec<ListEntry> {
        store
            .list()
            .into_iter()
            .map(|record| ListEntry {
                broken_links: record.broken_links(),
                record: record.clone(),
            })
            .collect()
    }

    pub async fn info(&self, repo_id: &str) -> Result<RepoInfo> {
        let repo = RepoId::parse(repo_id)?;
        self.enter(&repo.full_name(), Stage::Resolving);
        self.provider.repo_info(&repo).await
    }

    async fn resolve(&self, repo: &RepoId, tag: &str) -> Result<Release> {
        self.enter(&repo.full_name(), Stage::Resolving);
        let release = self.provider.release(repo, tag).await?;
        debug!(
            "Resolved {}@{} to {} ({} assets)",
            repo,
            tag,
            release.tag,
            release.assets.len()
        );
        Ok(release)
    }

    fn choose(&self, repo: RepoId, release: Release, req: &InstallRequest) -> Result<Target> {
        self.enter(&repo.full_name(), Stage::Selecting);
        let pattern = SelectionPattern::resolve(req.asset_pattern.as_deref(), &self.fingerprint)?;
        let asset = select(&release.assets, &pattern)?;
        info!("Selected {} from {} {}", asset.name, repo, release.tag);
        Ok(Target {
            repo: Some(repo),
            tag: release.tag,
            asset,
            siblings: release.assets,
        })
    }

    /// A direct download has no release behind it, so no tag is recorded.
    fn target_from_url(&self, url: &str) -> Result<Target> {
        let name = url_file_name(url).ok_or_else(|| {
            GrError::Validation(format!("cannot derive a file name from URL '{url}'"))
        })?;
        debug!("Direct URL install of {}; skipping release lookup", name);
        Ok(Target {
            repo: None,
            tag: String::new(),
            asset: ReleaseAsset {
                name,
                download_url: url.to_string(),
                size: 0,
            },
            siblings: Vec::new(),
        })
    }

    async fn materialize(
        &self,
        store: &mut InstallStore,
        req: &InstallRequest,
        target: Target,
    ) -> Result<InstallOutcome> {
        self.materialize_as(store, req, target, None).await
    }

    /// Stages `Confirming` through `Recorded`. `name` pins the record name
    /// (updates keep the name they were installed under).
    async fn materialize_as(
        &self,
        store: &mut InstallStore,
        req: &InstallRequest,
        target: Target,
        name: Option<&str>,
    ) -> Result<InstallOutcome> {
        let Target {
            repo,
            tag,
            asset,
            siblings,
        } = target;
        validate_asset_name(&asset.name)?;
        let base_name = match &repo {
            Some(repo) => repo.repo.clone(),
            None => url_stem(&asset.name).to_string(),
        };
        let name = name
            .map(str::to_string)
            .or_else(|| req.symlink_alias.clone())
            .unwrap_or_else(|| base_name.clone());
        let repo_name = repo.as_ref().map(RepoId::full_name);

        if let Some(existing) = store.get(&name) {
            if existing.repo != repo_name {
                return Err(GrError::Validation(format!(
                    "'{}' is already installed from {}; choose another --symlink-alias",
                    name,
                    existing.repo.as_deref().unwrap_or("a URL")
                )));
            }
        }

        self.enter(&name, Stage::Confirming);
        if !req.confirm {
            let message = if tag.is_empty() {
                format!("Install {} ({})?", name, asset.name)
            } else {
                format!("Install {} ({} {})?", name, asset.name, tag)
            };
            if !self.prompt.confirm(&message)? {
                return Err(GrError::Aborted(format!("installation of {name} declined")));
            }
        }

        self.enter(&name, Stage::Downloading);
        let asset_path = self.download(&name, &tag, &asset, req.download_only).await?;
        self.verify(&asset, &asset_path, &siblings).await?;
        if req.download_only {
            info!("Downloaded {} to {}", asset.name, asset_path.display());
            return Ok(InstallOutcome::Downloaded {
                path: asset_path,
                tag,
            });
        }

        self.enter(&name, Stage::Extracting);
        let extract_dir = extract(&asset_path, &self.config.extract_root(&name))?;

        self.enter(&name, Stage::Locating);
        let binaries = locate(&extract_dir, req.bin_pattern.as_deref())?;
        let plan = link_plan(
            &binaries,
            &self.config.bin_dir,
            req.symlink_alias.as_deref(),
            Some(&base_name),
            &self.fingerprint,
        )?;

        self.enter(&name, Stage::Linking);
        self.check_foreign_records(store, &name, plan.values())?;
        let links = LinkSet::create(&plan, &self.config.data_dir)?;

        let previous = store.get(&name).cloned();
        let requested_tag = if repo_name.is_some() {
            req.tag.clone()
        } else {
            String::new()
        };
        let record = InstallationRecord {
            name: name.clone(),
            repo: repo_name,
            tag,
            requested_tag,
            asset_url: asset.download_url.clone(),
            binaries,
            symlinks: plan,
            installed_at: Utc::now(),
            asset_pattern: req.asset_pattern.clone(),
            bin_pattern: req.bin_pattern.clone(),
            symlink_alias: req.symlink_alias.clone(),
            asset_path: Some(asset_path),
            extract_dir: Some(extract_dir),
        };
        // On failure `links` is dropped uncommitted and rolls back.
        store.put(record.clone())?;
        links.commit();
        self.enter(&name, Stage::Recorded);

        if let Some(previous) = previous {
            let current: BTreeSet<&PathBuf> = record.symlinks.values().collect();
            let stale: Vec<&PathBuf> = previous
                .symlinks
                .values()
                .filter(|l| !current.contains(l))
                .collect();
            for (link, reason) in remove_links(stale, &self.config.data_dir) {
                warn!("Could not remove stale symlink {}: {}", link.display(), reason);
            }
            let superseded = [
                (previous.extract_dir, &record.extract_dir, 1),
                (previous.asset_path, &record.asset_path, 2),
            ];
            for (old, new, depth) in superseded {
                let Some(old) = old.filter(|o| Some(o) != new.as_ref()) else {
                    continue;
                };
                debug!("Removing superseded {}", old.display());
                match purge_path(&old) {
                    Ok(_) => prune_empty_parents(&old, depth),
                    Err(e) => warn!("Could not remove {}: {}", old.display(), e),
                }
            }
        }
        info!(
            "Installed {} {} ({} binar{})",
            record.name,
            record.tag,
            record.binaries.len(),
            if record.binaries.len() == 1 { "y" } else { "ies" }
        );
        Ok(InstallOutcome::Installed(record))
    }

    /// A link path already owned by another record blocks this install.
    fn check_foreign_records<'a>(
        &self,
        store: &InstallStore,
        name: &str,
        links: impl IntoIterator<Item = &'a PathBuf>,
    ) -> Result<()> {
        for link in links {
            let owner = store
                .list()
                .into_iter()
                .find(|r| r.name != name && r.symlinks.values().any(|l| l == link));
            if let Some(owner) = owner {
                if owned_link_target(link, &self.config.data_dir).is_some() {
                    return Err(GrError::LinkError {
                        path: link.clone(),
                        reason: format!("already provided by '{}'", owner.name),
                    });
                }
            }
        }
        Ok(())
    }

    /// Cached asset path, fetching when the cache cannot be trusted.
    ///
    /// A cache entry counts only if it exists with the size the release
    /// publishes. Assets of unknown size (GitLab links, direct URLs) are always
    /// fetched again, as is everything under `force`.
    async fn download(
        &self,
        name: &str,
        tag: &str,
        asset: &ReleaseAsset,
        force: bool,
    ) -> Result<PathBuf> {
        let path = self.config.asset_cache_path(name, tag, &asset.name);
        if !force && asset.size != 0 {
            match fs::metadata(&path) {
                Ok(meta) if meta.is_file() && meta.len() == asset.size => {
                    info!("Using cached {}", path.display());
                    return Ok(path);
                }
                Ok(meta) => debug!(
                    "Ignoring cached {} ({} bytes, expected {})",
                    path.display(),
                    meta.len(),
                    asset.size
                ),
                Err(_) => {}
            }
        }
        info!("Downloading {}", asset.download_url);
        let written = self
            .fetcher
            .fetch(&asset.download_url, &path, self.progress.as_ref())
            .await?;
        if asset.size != 0 && written != asset.size {
            let _ = fs::remove_file(&path);
            return Err(GrError::DownloadError(
                asset.name.clone(),
                asset.download_url.clone(),
                format!("expected {} bytes, got {}", asset.size, written),
            ));
        }
        Ok(path)
    }

    /// Checks the asset against a published SHA-256 list, if any.
    async fn verify(
        &self,
        asset: &ReleaseAsset,
        path: &Path,
        siblings: &[ReleaseAsset],
    ) -> Result<()> {
        let Some(sums) = checksum_asset(&asset.name, siblings) else {
            debug!("No checksum file published for {}", asset.name);
            return Ok(());
        };
        let text = match self.fetcher.fetch_text(&sums.download_url).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Could not fetch {}: {}; skipping verification", sums.name, e);
                return Ok(());
            }
        };
        let Some(expected) = find_checksum(&text, &asset.name) else {
            debug!("{} has no entry for {}", sums.name, asset.name);
            return Ok(());
        };
        if let Err(e) = verify_checksum(path, &expected) {
            let _ = fs::remove_file(path);
            return Err(e);
        }
        debug!("Checksum of {} verified against {}", asset.name, sums.name);
        Ok(())
    }
}

/// A sidecar (`<asset>.sha256`) wins over a combined checksum list.
fn checksum_asset<'a>(asset: &str, siblings: &'a [ReleaseAsset]) -> Option<&'a ReleaseAsset> {
    let sidecars = [format!("{asset}.sha256"), format!("{asset}.sha256sum")];
    siblings
        .iter()
        .find(|a| sidecars.iter().any(|s| a.name.eq_ignore_ascii_case(s)))
        .or_else(|| {
            siblings.iter().find(|a| {
                let lower = a.name.to_ascii_lowercase();
                lower == "checksums.txt" || lower.ends_with("_checksums.txt") || lower.contains("sha256sums")
            })
        })
}

fn validate_asset_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(GrError::Validation(format!(
            "asset name '{name}' is not a plain file name"
        )));
    }
    Ok(())
}

/// Leading part of a file name up to the first `-`, `_` or `.`.
fn url_stem(file_name: &str) -> &str {
    match file_name.split(['-', '_', '.']).next() {
        Some(stem) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

/// Removes up to `depth` ancestors of `path` that are left empty.
fn prune_empty_parents(path: &Path, depth: usize) {
    for dir in path.ancestors().skip(1).take(depth) {
        if fs::remove_dir(dir).is_err() {
            break;
        }
    }
}

/// Deletes a file or directory; `Ok(false)` if it was already gone.
fn purge_path(path: &Path) -> std::io::Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).map(|_| true),
        Ok(_) => fs::remove_file(path).map(|_| true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> ReleaseAsset {
        ReleaseAsset {
            name: name.to_string(),
            download_url: format!("https://example.com/{name}"),
            size: 1,
        }
    }

    #[test]
    fn url_stem_stops_at_first_separator() {
        assert_eq!(url_stem("tool-linux-amd64.tar.gz"), "tool");
        assert_eq!(url_stem("ripgrep_14.1_x86_64.zip"), "ripgrep");
        assert_eq!(url_stem("-weird"), "-weird");
    }

    #[test]
    fn sidecar_checksum_is_preferred() {
        let siblings = [
            asset("tool.tar.gz"),
            asset("checksums.txt"),
            asset("tool.tar.gz.sha256"),
        ];
        assert_eq!(
            checksum_asset("tool.tar.gz", &siblings).unwrap().name,
            "tool.tar.gz.sha256"
        );
        assert_eq!(
            checksum_asset("other.zip", &siblings).unwrap().name,
            "checksums.txt"
        );
        assert!(checksum_asset("tool.tar.gz", &[asset("tool.tar.gz")]).is_none());
    }

    #[test]
    fn asset_names_must_be_plain() {
        assert!(validate_asset_name("tool.tar.gz").is_ok());
        assert!(validate_asset_name("../tool").is_err());
        assert!(validate_asset_name("").is_err());
    }

    #[test]
    fn requests_default_to_latest() {
        let req = InstallRequest {
            tag: "v1".to_string(),
            asset_pattern: Some("musl".to_string()),
            ..InstallRequest::for_repo("o/tool")
        };
        assert_eq!(req.repo_id.as_deref(), Some("o/tool"));
        assert_eq!(req.tag, "v1");
        assert_eq!(InstallRequest::for_repo("o/tool").tag, LATEST_TAG);
        assert!(InstallRequest::for_url("https://x/y").repo_id.is_none());
    }
}
