// getrelease-core/tests/installer.rs
//! End-to-end installer runs against an in-process release provider and
//! fetcher, with every directory under a temp root.
#![cfg(unix)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use getrelease_common::error::{GrError, Result};
use getrelease_common::model::{Release, ReleaseAsset, RepoId, RepoInfo};
use getrelease_common::provider::{AssetFetcher, ConfirmPrompt, MetadataProvider, ProgressReporter};
use getrelease_common::Config;
use getrelease_core::{
    InstallOutcome, InstallRequest, InstallStore, Installer, PlatformFingerprint, UpdateOutcome,
};
use tempfile::TempDir;

#[derive(Default)]
struct FakeProvider {
    releases: RefCell<HashMap<String, Vec<Release>>>,
}

impl FakeProvider {
    fn publish(&self, repo: &str, tag: &str, assets: Vec<ReleaseAsset>) {
        self.releases
            .borrow_mut()
            .entry(repo.to_string())
            .or_default()
            .push(Release {
                tag: tag.to_string(),
                published_at: None,
                assets,
            });
    }
}

impl MetadataProvider for FakeProvider {
    async fn repo_info(&self, repo: &RepoId) -> Result<RepoInfo> {
        if !self.releases.borrow().contains_key(&repo.full_name()) {
            return Err(GrError::RepoNotFound(repo.full_name()));
        }
        Ok(RepoInfo {
            full_name: repo.full_name(),
            stars: 42,
            ..RepoInfo::default()
        })
    }

    async fn release(&self, repo: &RepoId, tag: &str) -> Result<Release> {
        let releases = self.releases.borrow();
        let list = releases
            .get(&repo.full_name())
            .ok_or_else(|| GrError::RepoNotFound(repo.full_name()))?;
        let found = if tag == "latest" {
            list.last()
        } else {
            list.iter().find(|r| r.tag == tag)
        };
        found.cloned().ok_or_else(|| GrError::ReleaseNotFound {
            repo: repo.full_name(),
            tag: tag.to_string(),
        })
    }
}

#[derive(Default)]
struct FakeFetcher {
    files: RefCell<HashMap<String, Vec<u8>>>,
    fetches: Cell<usize>,
}

impl FakeFetcher {
    fn serve(&self, url: &str, bytes: Vec<u8>) {
        self.files.borrow_mut().insert(url.to_string(), bytes);
    }
}

impl AssetFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, dest: &Path, progress: &dyn ProgressReporter) -> Result<u64> {
        let bytes = self.files.borrow().get(url).cloned().ok_or_else(|| {
            GrError::DownloadError(url.to_string(), url.to_string(), "404".to_string())
        })?;
        self.fetches.set(self.fetches.get() + 1);
        fs::create_dir_all(dest.parent().unwrap())?;
        fs::write(dest, &bytes)?;
        progress.on_progress(bytes.len() as u64, Some(bytes.len() as u64));
        Ok(bytes.len() as u64)
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let bytes = self.files.borrow().get(url).cloned().ok_or_else(|| {
            GrError::DownloadError(url.to_string(), url.to_string(), "404".to_string())
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

struct Decline;

impl ConfirmPrompt for Decline {
    fn confirm(&self, _message: &str) -> Result<bool> {
        Ok(false)
    }
}

struct Harness {
    root: TempDir,
    installer: Installer<FakeProvider, FakeFetcher>,
    store: InstallStore,
}

impl Harness {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let config = Config::with_root(root.path());
        let store = InstallStore::open(&config.store_path()).unwrap();
        let installer = Installer::new(config, FakeProvider::default(), FakeFetcher::default())
            .with_fingerprint(PlatformFingerprint::for_target("linux", "x86_64"));
        Self {
            root,
            installer,
            store,
        }
    }

    fn config(&self) -> &Config {
        self.installer.config()
    }

    fn fetches(&self) -> usize {
        self.installer.fetcher().fetches.get()
    }

    /// Publishes `repo@tag` with a linux and a darwin tarball, each holding
    /// `bins` as executables under `bin/`.
    fn publish(&self, repo: &str, tag: &str, bins: &[&str]) -> Vec<ReleaseAsset> {
        let project = repo.rsplit('/').next().unwrap();
        let assets: Vec<ReleaseAsset> = ["linux", "darwin"]
            .iter()
            .map(|os| {
                let name = format!("{project}-{tag}-{os}-amd64.tar.gz");
                let bytes = tarball(tag, bins);
                self.asset(repo, tag, &name, bytes)
            })
            .collect();
        self.installer.provider().publish(repo, tag, assets.clone());
        assets
    }

    fn asset(&self, repo: &str, tag: &str, name: &str, bytes: Vec<u8>) -> ReleaseAsset {
        let url = format!("https://github.com/{repo}/releases/download/{tag}/{name}");
        let size = bytes.len() as u64;
        self.installer.fetcher().serve(&url, bytes);
        ReleaseAsset {
            name: name.to_string(),
            download_url: url,
            size,
        }
    }

    async fn install(&mut self, req: InstallRequest) -> Result<InstallOutcome> {
        self.installer.install(&mut self.store, &req).await
    }
}

fn request(repo: &str) -> InstallRequest {
    InstallRequest {
        confirm: true,
        ..InstallRequest::for_repo(repo)
    }
}

fn tarball(tag: &str, bins: &[&str]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for bin in bins {
        let script = format!("#!/bin/sh\necho {bin} {tag}\n");
        let mut header = tar::Header::new_gnu();
        header.set_size(script.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("tool-{tag}/bin/{bin}"), script.as_bytes())
            .unwrap();
    }
    let mut readme = tar::Header::new_gnu();
    readme.set_size(4);
    readme.set_mode(0o644);
    readme.set_cksum();
    builder
        .append_data(&mut readme, format!("tool-{tag}/README"), &b"docs"[..])
        .unwrap();
    let tar = builder.into_inner().unwrap();

    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&tar).unwrap();
    enc.finish().unwrap()
}

fn installed(outcome: InstallOutcome) -> getrelease_common::InstallationRecord {
    match outcome {
        InstallOutcome::Installed(record) => record,
        other => panic!("expected an installation, got {other:?}"),
    }
}

#[tokio::test]
async fn install_links_binary_and_records_resolved_tag() {
    let mut h = Harness::new();
    h.publish("acme/tool", "v1.0.0", &["tool"]);

    let record = installed(h.install(request("acme/tool")).await.unwrap());

    assert_eq!(record.name, "tool");
    assert_eq!(record.repo.as_deref(), Some("acme/tool"));
    assert_eq!(record.tag, "v1.0.0");
    assert_eq!(record.requested_tag, "latest");
    assert!(record.asset_url.ends_with("tool-v1.0.0-linux-amd64.tar.gz"));

    let link = h.config().bin_dir.join("tool");
    let binary = fs::read_link(&link).unwrap();
    assert!(binary.starts_with(&h.config().data_dir));
    assert!(record.binaries.contains(&binary));
    assert_eq!(record.symlinks.get(&binary), Some(&link));
    assert!(fs::read_to_string(&link).unwrap().contains("tool v1.0.0"));
    assert_eq!(h.store.get("tool"), Some(&record));
}

#[tokio::test]
async fn reinstall_is_idempotent_and_reuses_the_cache() {
    let mut h = Harness::new();
    h.publish("acme/tool", "v1.0.0", &["tool"]);

    let first = installed(h.install(request("acme/tool")).await.unwrap());
    let second = installed(h.install(request("acme/tool")).await.unwrap());

    assert_eq!(h.store.len(), 1);
    assert_eq!(h.fetches(), 1);
    assert_eq!(first.symlinks, second.symlinks);
    assert!(second.installed_at >= first.installed_at);
    assert!(h.store.get("tool").unwrap().is_healthy());
}

#[tokio::test]
async fn download_only_fetches_fresh_and_records_nothing() {
    let mut h = Harness::new();
    h.publish("acme/tool", "v1.0.0", &["tool"]);
    let req = InstallRequest {
        download_only: true,
        ..request("acme/tool")
    };

    for expected_fetches in 1..=2 {
        match h.install(req.clone()).await.unwrap() {
            InstallOutcome::Downloaded { path, tag } => {
                assert_eq!(tag, "v1.0.0");
                assert!(path.starts_with(&h.config().cache_dir));
                assert!(path.is_file());
            }
            other => panic!("expected a download, got {other:?}"),
        }
        assert_eq!(h.fetches(), expected_fetches);
    }
    assert!(h.store.is_empty());
    assert!(!h.config().bin_dir.join("tool").exists());
}

#[tokio::test]
async fn ambiguous_release_downloads_nothing_until_narrowed() {
    let mut h = Harness::new();
    let gnu = h.asset(
        "acme/tool",
        "v1",
        "tool-x86_64-unknown-linux-gnu.tar.gz",
        tarball("v1", &["tool"]),
    );
    let musl = h.asset(
        "acme/tool",
        "v1",
        "tool-x86_64-unknown-linux-musl.tar.gz",
        tarball("v1", &["tool"]),
    );
    h.installer
        .provider()
        .publish("acme/tool", "v1", vec![gnu.clone(), musl.clone()]);

    match h.install(request("acme/tool")).await {
        Err(GrError::AmbiguousAsset { candidates, .. }) => {
            assert_eq!(candidates, vec![gnu.clone(), musl]);
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }
    assert_eq!(h.fetches(), 0);
    assert!(h.store.is_empty());

    let narrowed = InstallRequest {
        asset_pattern: Some("gnu".to_string()),
        ..request("acme/tool")
    };
    let record = installed(h.install(narrowed).await.unwrap());
    assert_eq!(record.asset_url, gnu.download_url);
    assert_eq!(record.asset_pattern.as_deref(), Some("gnu"));
}

#[tokio::test]
async fn no_match_reports_every_asset() {
    let mut h = Harness::new();
    let assets = h.publish("acme/tool", "v1", &["tool"]);
    let req = InstallRequest {
        asset_pattern: Some("windows".to_string()),
        ..request("acme/tool")
    };
    match h.install(req).await {
        Err(GrError::NoMatch { candidates, .. }) => assert_eq!(candidates, assets),
        other => panic!("expected no match, got {other:?}"),
    }
}

#[tokio::test]
async fn declined_confirmation_has_no_side_effects() {
    let root = TempDir::new().unwrap();
    let config = Config::with_root(root.path());
    let mut store = InstallStore::open(&config.store_path()).unwrap();
    let installer = Installer::new(config, FakeProvider::default(), FakeFetcher::default())
        .with_fingerprint(PlatformFingerprint::for_target("linux", "x86_64"))
        .with_prompt(Decline);
    let bytes = tarball("v1", &["tool"]);
    let url = "https://github.com/acme/tool/releases/download/v1/tool-linux-amd64.tar.gz";
    installer.fetcher().serve(url, bytes.clone());
    installer.provider().publish(
        "acme/tool",
        "v1",
        vec![ReleaseAsset {
            name: "tool-linux-amd64.tar.gz".to_string(),
            download_url: url.to_string(),
            size: bytes.len() as u64,
        }],
    );

    let result = installer
        .install(&mut store, &InstallRequest::for_repo("acme/tool"))
        .await;
    assert!(matches!(result, Err(GrError::Aborted(_))));
    assert_eq!(installer.fetcher().fetches.get(), 0);
    assert!(store.is_empty());
    assert!(!installer.config().cache_dir.exists());
}

#[tokio::test]
async fn remove_deletes_symlinks_and_record() {
    let mut h = Harness::new();
    h.publish("acme/tool", "v1", &["tool", "tool-helper"]);
    let record = installed(h.install(request("acme/tool")).await.unwrap());
    assert_eq!(record.symlinks.len(), 2);

    let outcome = h.installer.remove(&mut h.store, "tool", true).unwrap();

    assert!(outcome.link_failures.is_empty());
    assert!(h.store.get("tool").is_none());
    for link in record.symlinks.values() {
        assert!(link.symlink_metadata().is_err(), "{} still exists", link.display());
    }
    let extract_dir = record.extract_dir.clone().unwrap();
    assert!(!extract_dir.exists());
    assert!(outcome.purged.contains(&extract_dir));
    assert!(InstallStore::open(&h.config().store_path())
        .unwrap()
        .get("tool")
        .is_none());

    assert!(matches!(
        h.installer.remove(&mut h.store, "tool", false),
        Err(GrError::NotInstalled(_))
    ));
}

#[tokio::test]
async fn remove_keeps_going_when_a_link_was_replaced_by_a_file() {
    let mut h = Harness::new();
    h.publish("acme/tool", "v1", &["tool"]);
    installed(h.install(request("acme/tool")).await.unwrap());
    let link = h.config().bin_dir.join("tool");
    fs::remove_file(&link).unwrap();
    fs::write(&link, b"user data").unwrap();

    let outcome = h.installer.remove(&mut h.store, "tool", false).unwrap();
    assert_eq!(outcome.link_failures.len(), 1);
    assert!(h.store.get("tool").is_none());
    assert_eq!(fs::read(&link).unwrap(), b"user data");
}

#[tokio::test]
async fn update_all_skips_url_installs_and_updates_latest() {
    let mut h = Harness::new();
    h.publish("acme/tool", "v1", &["tool", "tool-legacy"]);
    installed(h.install(request("acme/tool")).await.unwrap());

    let url = "https://example.com/downloads/other-linux-amd64";
    h.installer
        .fetcher()
        .serve(url, b"#!/bin/sh\necho other\n".to_vec());
    let url_req = InstallRequest {
        confirm: true,
        ..InstallRequest::for_url(url)
    };
    let url_record = installed(h.install(url_req).await.unwrap());
    assert_eq!(url_record.name, "other");
    assert_eq!(url_record.repo, None);
    assert_eq!(url_record.tag, "");
    assert_eq!(url_record.requested_tag, "");
    assert!(h.config().bin_dir.join("other").symlink_metadata().is_ok());

    h.publish("acme/tool", "v2", &["tool"]);
    let report = h.installer.update_all(&mut h.store).await;

    assert!(report.is_success());
    let outcomes: HashMap<_, _> = report
        .results
        .into_iter()
        .map(|(name, r)| (name, r.unwrap()))
        .collect();
    assert!(matches!(outcomes["other"], UpdateOutcome::Skipped { .. }));
    match &outcomes["tool"] {
        UpdateOutcome::Updated { from, record } => {
            assert_eq!(from, "v1");
            assert_eq!(record.tag, "v2");
        }
        other => panic!("expected an update, got {other:?}"),
    }

    assert_eq!(h.store.get("other").unwrap().installed_at, url_record.installed_at);
    assert_eq!(h.store.get("tool").unwrap().tag, "v2");
    assert!(fs::read_to_string(h.config().bin_dir.join("tool"))
        .unwrap()
        .contains("tool v2"));
    assert!(h
        .config()
        .bin_dir
        .join("tool-legacy")
        .symlink_metadata()
        .is_err());
}

/// Publishes `acme/tool@tag` with a single asset whose name does not change
/// between releases and whose size the forge does not report.
fn publish_unsized(h: &Harness, tag: &str) -> ReleaseAsset {
    let asset = ReleaseAsset {
        size: 0,
        ..h.asset("acme/tool", tag, "tool-linux-amd64.tar.gz", tarball(tag, &["tool"]))
    };
    h.installer
        .provider()
        .publish("acme/tool", tag, vec![asset.clone()]);
    asset
}

#[tokio::test]
async fn update_with_unsized_asset_fetches_the_new_release() {
    let mut h = Harness::new();
    publish_unsized(&h, "v1");
    installed(h.install(request("acme/tool")).await.unwrap());
    assert_eq!(h.fetches(), 1);

    publish_unsized(&h, "v2");
    match h.installer.update(&mut h.store, "tool").await.unwrap() {
        UpdateOutcome::Updated { from, record } => {
            assert_eq!(from, "v1");
            assert_eq!(record.tag, "v2");
        }
        other => panic!("expected an update, got {other:?}"),
    }

    assert_eq!(h.fetches(), 2);
    assert!(fs::read_to_string(h.config().bin_dir.join("tool"))
        .unwrap()
        .contains("tool v2"));
    let cache = |tag: &str| {
        h.config()
            .asset_cache_path("tool", tag, "tool-linux-amd64.tar.gz")
    };
    assert!(cache("v2").is_file());
    assert!(!cache("v1").exists());
    assert!(h.store.get("tool").unwrap().is_healthy());
}

#[tokio::test]
async fn unsized_asset_is_never_served_from_the_cache() {
    let mut h = Harness::new();
    publish_unsized(&h, "v1");
    installed(h.install(request("acme/tool")).await.unwrap());
    installed(h.install(request("acme/tool")).await.unwrap());
    assert_eq!(h.fetches(), 2);
}

#[tokio::test]
async fn cached_asset_with_wrong_size_is_downloaded_again() {
    let mut h = Harness::new();
    let assets = h.publish("acme/tool", "v1", &["tool"]);
    let linux = &assets[0];
    installed(h.install(request("acme/tool")).await.unwrap());

    let cached = h.config().asset_cache_path("tool", "v1", &linux.name);
    fs::write(&cached, b"truncated").unwrap();
    let record = installed(h.install(request("acme/tool")).await.unwrap());

    assert_eq!(h.fetches(), 2);
    assert_eq!(fs::metadata(&cached).unwrap().len(), linux.size);
    assert!(record.is_healthy());
    assert!(fs::read_to_string(h.config().bin_dir.join("tool"))
        .unwrap()
        .contains("tool v1"));
}

/// A tarball whose `tool-v1/out` entry is a symlink to `target`, followed by
/// an executable written through it.
fn tarball_through_symlink(target: &Path) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    let mut link = tar::Header::new_gnu();
    link.set_entry_type(tar::EntryType::Symlink);
    link.set_size(0);
    link.set_mode(0o777);
    builder.append_link(&mut link, "tool-v1/out", target).unwrap();

    let script = b"#!/bin/sh\necho pwned\n";
    let mut file = tar::Header::new_gnu();
    file.set_size(script.len() as u64);
    file.set_mode(0o755);
    file.set_cksum();
    builder
        .append_data(&mut file, "tool-v1/out/tool", &script[..])
        .unwrap();
    let tar = builder.into_inner().unwrap();

    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&tar).unwrap();
    enc.finish().unwrap()
}

#[tokio::test]
async fn archive_symlinks_cannot_place_files_outside_the_install() {
    let outside = TempDir::new().unwrap();
    let targets = [outside.path().to_path_buf(), PathBuf::from("../../..")];
    for (i, target) in targets.iter().enumerate() {
        let mut h = Harness::new();
        let tag = format!("v{i}");
        let asset = h.asset(
            "acme/tool",
            &tag,
            "tool-linux-amd64.tar.gz",
            tarball_through_symlink(target),
        );
        h.installer.provider().publish("acme/tool", &tag, vec![asset]);

        let result = h.install(request("acme/tool")).await;

        assert!(
            matches!(result, Err(GrError::ExtractionError { .. })),
            "{target:?}: {result:?}"
        );
        assert!(h.store.is_empty());
        assert!(!outside.path().join("tool").exists());
        assert!(!h.root.path().join("tool").exists());
        assert!(!h.config().extract_root("tool").join("tool-linux-amd64").exists());
        assert!(h.config().bin_dir.join("tool").symlink_metadata().is_err());
    }
}

#[tokio::test]
async fn update_reports_up_to_date_and_pinned_records() {
    let mut h = Harness::new();
    h.publish("acme/tool", "v1", &["tool"]);
    h.publish("acme/pinned", "v1", &["pinned"]);
    installed(h.install(request("acme/tool")).await.unwrap());
    let pinned = InstallRequest {
        tag: "v1".to_string(),
        ..request("acme/pinned")
    };
    installed(h.install(pinned).await.unwrap());
    let fetches = h.fetches();

    assert_eq!(
        h.installer.update(&mut h.store, "tool").await.unwrap(),
        UpdateOutcome::UpToDate {
            tag: "v1".to_string()
        }
    );
    assert!(matches!(
        h.installer.update(&mut h.store, "pinned").await.unwrap(),
        UpdateOutcome::Skipped { .. }
    ));
    assert!(matches!(
        h.installer.update(&mut h.store, "missing").await,
        Err(GrError::NotInstalled(_))
    ));
    assert_eq!(h.fetches(), fetches);
}

#[tokio::test]
async fn blocked_link_rolls_back_every_link() {
    let mut h = Harness::new();
    h.publish("acme/tool", "v1", &["alpha", "beta"]);
    fs::create_dir_all(&h.config().bin_dir).unwrap();
    fs::write(h.config().bin_dir.join("beta"), b"not ours").unwrap();

    let result = h.install(request("acme/tool")).await;

    assert!(matches!(result, Err(GrError::LinkError { .. })));
    assert!(h.config().bin_dir.join("alpha").symlink_metadata().is_err());
    assert_eq!(fs::read(h.config().bin_dir.join("beta")).unwrap(), b"not ours");
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn alias_with_several_binaries_is_rejected() {
    let mut h = Harness::new();
    h.publish("acme/tool", "v1", &["alpha", "beta"]);
    let req = InstallRequest {
        symlink_alias: Some("t".to_string()),
        ..request("acme/tool")
    };
    assert!(matches!(
        h.install(req).await,
        Err(GrError::AmbiguousAlias { .. })
    ));

    let narrowed = InstallRequest {
        symlink_alias: Some("t".to_string()),
        bin_pattern: Some("alpha$".to_string()),
        ..request("acme/tool")
    };
    let record = installed(h.install(narrowed).await.unwrap());
    assert_eq!(record.name, "t");
    assert!(fs::read_to_string(h.config().bin_dir.join("t"))
        .unwrap()
        .contains("alpha"));
}

#[tokio::test]
async fn checksum_mismatch_discards_cached_asset() {
    let mut h = Harness::new();
    let bytes = tarball("v1", &["tool"]);
    let asset = h.asset("acme/tool", "v1", "tool-linux-amd64.tar.gz", bytes);
    let sums = h.asset(
        "acme/tool",
        "v1",
        "checksums.txt",
        format!("{}  tool-linux-amd64.tar.gz\n", "0".repeat(64)).into_bytes(),
    );
    h.installer
        .provider()
        .publish("acme/tool", "v1", vec![asset, sums]);

    let result = h.install(request("acme/tool")).await;

    assert!(matches!(result, Err(GrError::ChecksumMismatch(_))));
    assert!(!h
        .config()
        .asset_cache_path("tool", "v1", "tool-linux-amd64.tar.gz")
        .exists());
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn matching_checksum_installs() {
    let mut h = Harness::new();
    let bytes = tarball("v1", &["tool"]);
    let digest = getrelease_net::validation::sha256_file(&{
        let p = h.root.path().join("digest-source");
        fs::write(&p, &bytes).unwrap();
        p
    })
    .unwrap();
    let asset = h.asset("acme/tool", "v1", "tool-linux-amd64.tar.gz", bytes);
    let sidecar = h.asset(
        "acme/tool",
        "v1",
        "tool-linux-amd64.tar.gz.sha256",
        digest.into_bytes(),
    );
    h.installer
        .provider()
        .publish("acme/tool", "v1", vec![asset, sidecar]);

    installed(h.install(request("acme/tool")).await.unwrap());
}

#[tokio::test]
async fn records_survive_reopening_the_store() {
    let mut h = Harness::new();
    h.publish("acme/tool", "v1", &["tool", "tool-helper"]);
    let record = installed(h.install(request("acme/tool")).await.unwrap());

    let reopened = InstallStore::open(&h.config().store_path()).unwrap();
    assert_eq!(reopened.get("tool"), Some(&record));
}

#[tokio::test]
async fn list_flags_broken_links() {
    let mut h = Harness::new();
    h.publish("acme/tool", "v1", &["tool"]);
    h.publish("acme/other", "v1", &["other"]);
    installed(h.install(request("acme/tool")).await.unwrap());
    installed(h.install(request("acme/other")).await.unwrap());
    fs::remove_file(h.config().bin_dir.join("other")).unwrap();

    let entries = h.installer.list(&h.store);
    let health: Vec<_> = entries
        .iter()
        .map(|e| (e.record.name.as_str(), e.is_healthy()))
        .collect();
    assert_eq!(health, [("other", false), ("tool", true)]);
}

#[tokio::test]
async fn info_passes_through_the_provider() {
    let h = Harness::new();
    h.publish("acme/tool", "v1", &["tool"]);
    let info = h.installer.info("https://github.com/acme/tool").await.unwrap();
    assert_eq!(info.full_name, "acme/tool");
    assert_eq!(info.stars, 42);
    assert!(matches!(
        h.installer.info("acme/missing").await,
        Err(GrError::RepoNotFound(_))
    ));
}
