// getrelease-common/src/error.rs
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::model::ReleaseAsset;

#[derive(Error, Debug, Clone)]
pub enum GrError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("HTTP Request Error: {0}")]
    Http(#[from] Arc<reqwest::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Invalid regular expression: {0}")]
    Regex(#[from] Arc<regex::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Validation Error: {0}")]
    Validation(String),

    #[error("Repository not found: {0}")]
    RepoNotFound(String),

    #[error("Release '{tag}' not found for {repo}")]
    ReleaseNotFound { repo: String, tag: String },

    #[error(
        "No release asset matches {pattern}; available assets:{}\ntry a narrower --asset-pattern",
        format_candidates(.candidates)
    )]
    NoMatch {
        pattern: String,
        candidates: Vec<ReleaseAsset>,
    },

    #[error(
        "{} release assets match {pattern}, expected exactly one:{}\nretry with an --asset-pattern that selects one of them",
        .candidates.len(),
        format_candidates(.candidates)
    )]
    AmbiguousAsset {
        pattern: String,
        candidates: Vec<ReleaseAsset>,
    },

    #[error("DownloadError: Failed to download '{0}' from '{1}': {2}")]
    DownloadError(String, String, String),

    #[error("Checksum Mismatch: {0}")]
    ChecksumMismatch(String),

    #[error("Extraction of {} failed: {reason}", .path.display())]
    ExtractionError { path: PathBuf, reason: String },

    #[error("No executable matching '{pattern}' found in {}", .dir.display())]
    NoBinaryFound { dir: PathBuf, pattern: String },

    #[error(
        "Symlink alias '{alias}' cannot name {} binaries:{}\nuse --bin-pattern to select a single binary",
        .binaries.len(),
        format_paths(.binaries)
    )]
    AmbiguousAlias {
        alias: String,
        binaries: Vec<PathBuf>,
    },

    #[error("Cannot link {}: {reason}", .path.display())]
    LinkError { path: PathBuf, reason: String },

    #[error("Install records in {} are unreadable: {reason}", .path.display())]
    StoreCorruption { path: PathBuf, reason: String },

    #[error("'{0}' is not installed")]
    NotInstalled(String),

    #[error("Aborted: {0}")]
    Aborted(String),

    #[error("Generic Error: {0}")]
    Generic(String),
}

fn format_candidates(candidates: &[ReleaseAsset]) -> String {
    let mut out = String::new();
    if candidates.is_empty() {
        out.push_str(" (none)");
    }
    for asset in candidates {
        let _ = write!(out, "\n  {} ({})", asset.name, asset.download_url);
    }
    out
}

fn format_paths(paths: &[PathBuf]) -> String {
    let mut out = String::new();
    for path in paths {
        let _ = write!(out, "\n  {}", path.display());
    }
    out
}

impl From<std::io::Error> for GrError {
    fn from(err: std::io::Error) -> Self {
        GrError::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for GrError {
    fn from(err: reqwest::Error) -> Self {
        GrError::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for GrError {
    fn from(err: serde_json::Error) -> Self {
        GrError::Json(Arc::new(err))
    }
}

impl From<regex::Error> for GrError {
    fn from(err: regex::Error) -> Self {
        GrError::Regex(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, GrError>;
