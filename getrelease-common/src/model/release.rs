// getrelease-common/src/model/release.rs
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{GrError, Result};

/// Tag value that asks the forge for its most recent published release.
pub const LATEST_TAG: &str = "latest";

/// Tag aliases that select the newest release flagged as a pre-release.
pub const PRERELEASE_TAGS: [&str; 3] = ["pre", "pre-release", "prerelease"];

/// A single downloadable artifact of a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub download_url: String,
    /// Size in bytes as reported by the forge; 0 when unknown.
    pub size: u64,
}

/// A concrete release: `tag` is always resolved, never `"latest"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub tag: String,
    pub published_at: Option<String>,
    pub assets: Vec<ReleaseAsset>,
}

/// Repository metadata shown by `info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub full_name: String,
    pub description: Option<String>,
    pub topics: Vec<String>,
    pub language: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub url: String,
    pub updated_at: Option<String>,
    pub created_at: Option<String>,
    pub open_issues: u64,
    pub visibility: Option<String>,
    pub archived: bool,
}

impl RepoInfo {
    /// Ordered key/value rows for display.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        let opt = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        vec![
            ("name", self.full_name.clone()),
            ("description", opt(&self.description)),
            ("topics", self.topics.join(", ")),
            ("language", opt(&self.language)),
            ("stars", self.stars.to_string()),
            ("forks", self.forks.to_string()),
            ("url", self.url.clone()),
            ("updated", opt(&self.updated_at)),
            ("created", opt(&self.created_at)),
            ("issues", self.open_issues.to_string()),
            ("visibility", opt(&self.visibility)),
            ("archived", self.archived.to_string()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Forge {
    GitHub,
    GitLab,
    /// Plain `owner/repo`: the provider has to look it up.
    Unknown,
}

/// A parsed repository identifier (`owner/repo` plus the forge it lives on).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
    pub forge: Forge,
}

impl RepoId {
    /// Parses `owner/repo`, `github.com/owner/repo` or a full forge URL.
    ///
    /// Extra path segments after the repository (for example `/releases`) are
    /// ignored.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if !trimmed.contains('/') {
            return Err(GrError::Validation(format!(
                "please provide a url or owner/repo separated by a slash, e.g. \"junegunn/fzf\" (got '{trimmed}')"
            )));
        }

        let (forge, path) = if trimmed.contains(".com") {
            let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
                trimmed.to_string()
            } else {
                format!("https://{}", trimmed.trim_start_matches('/'))
            };
            let url = Url::parse(&with_scheme).map_err(|e| {
                GrError::Validation(format!("Failed to parse repository URL '{trimmed}': {e}"))
            })?;
            let forge = match url.host_str() {
                Some(h) if h.ends_with("github.com") => Forge::GitHub,
                Some(h) if h.ends_with("gitlab.com") => Forge::GitLab,
                _ => Forge::Unknown,
            };
            (forge, url.path().to_string())
        } else {
            (Forge::Unknown, trimmed.to_string())
        };

        let mut parts = path.trim_matches('/').split('/');
        let owner = parts.next().unwrap_or_default();
        let repo = parts.next().unwrap_or_default().trim_end_matches(".git");
        if owner.is_empty() || repo.is_empty() {
            return Err(GrError::Validation(format!(
                "could not parse owner and repository name from '{trimmed}'"
            )));
        }
        debug!("Parsed repository id '{}' as {}/{} ({:?})", trimmed, owner, repo, forge);
        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            forge,
        })
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// File name of a download URL: its last non-empty path segment.
pub fn url_file_name(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains(':'))
        .map(|s| s.to_string())
}
