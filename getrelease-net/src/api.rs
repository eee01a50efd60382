// getrelease-net/src/api.rs
//! GitHub and GitLab release metadata.
use std::collections::HashMap;

use getrelease_common::config::Config;
use getrelease_common::error::{GrError, Result};
use getrelease_common::model::{Forge, Release, ReleaseAsset, RepoId, RepoInfo, PRERELEASE_TAGS};
use getrelease_common::provider::MetadataProvider;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::http::build_http_client;

const RELEASES_PER_PAGE: u32 = 100;

#[derive(Debug, Deserialize)]
struct GithubRepo {
    full_name: String,
    description: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
    language: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    html_url: String,
    updated_at: Option<String>,
    created_at: Option<String>,
    #[serde(default)]
    open_issues_count: u64,
    visibility: Option<String>,
    #[serde(default)]
    archived: bool,
}

#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
    published_at: Option<String>,
    #[serde(default)]
    prerelease: bool,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
    name: String,
    browser_download_url: String,
    #[serde(default)]
    size: u64,
}

#[derive(Debug, Deserialize)]
struct GitlabProject {
    path_with_namespace: String,
    description: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    star_count: u64,
    #[serde(default)]
    forks_count: u64,
    web_url: String,
    last_activity_at: Option<String>,
    created_at: Option<String>,
    #[serde(default)]
    open_issues_count: u64,
    visibility: Option<String>,
    #[serde(default)]
    archived: bool,
}

#[derive(Debug, Deserialize)]
struct GitlabRelease {
    tag_name: String,
    released_at: Option<String>,
    #[serde(default)]
    assets: GitlabAssets,
}

#[derive(Debug, Default, Deserialize)]
struct GitlabAssets {
    #[serde(default)]
    links: Vec<GitlabLink>,
}

#[derive(Debug, Deserialize)]
struct GitlabLink {
    name: String,
    url: String,
    direct_asset_url: Option<String>,
}

impl From<GithubRelease> for Release {
    fn from(r: GithubRelease) -> Self {
        Release {
            tag: r.tag_name,
            published_at: r.published_at,
            assets: r
                .assets
                .into_iter()
                .map(|a| ReleaseAsset {
                    name: a.name,
                    download_url: a.browser_download_url,
                    size: a.size,
                })
                .collect(),
        }
    }
}

impl From<GitlabRelease> for Release {
    fn from(r: GitlabRelease) -> Self {
        Release {
            tag: r.tag_name,
            published_at: r.released_at,
            assets: r
                .assets
                .links
                .into_iter()
                .map(|l| ReleaseAsset {
                    name: l.name,
                    download_url: l.direct_asset_url.unwrap_or(l.url),
                    size: 0,
                })
                .collect(),
        }
    }
}

/// Which resource a request was for, so a 404 maps to the right error.
#[derive(Debug, Clone, Copy)]
enum Lookup<'a> {
    Repo,
    Release(&'a str),
}

/// Metadata provider for GitHub and GitLab hosted repositories.
#[derive(Debug, Clone)]
pub struct ForgeClient {
    client: Client,
    github_api_url: String,
    gitlab_api_url: String,
    github_token: Option<String>,
    gitlab_token: Option<String>,
}

impl ForgeClient {
    pub fn new(config: &Config) -> Result<Self> {
        if config.github_token.is_none() {
            warn!(
                "GITHUB_TOKEN is not set. Setting it raises the GitHub API rate limit from 60/hr to 5000/hr."
            );
        }
        Ok(Self {
            client: build_http_client()?,
            github_api_url: config.github_api_url.trim_end_matches('/').to_string(),
            gitlab_api_url: config.gitlab_api_url.trim_end_matches('/').to_string(),
            github_token: config.github_token.clone(),
            gitlab_token: config.gitlab_token.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        token: Option<&str>,
        repo: &RepoId,
        lookup: Lookup<'_>,
    ) -> Result<T> {
        debug!("Querying {}", url);
        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| GrError::Config(format!("invalid API token: {e}")))?;
            value.set_sensitive(true);
            request = request.header(AUTHORIZATION, value);
        }
        let response = request.send().await?;
        let status = response.status();
        debug!("Received HTTP status: {} for {}", status, url);
        match status {
            s if s.is_success() => Ok(response.json::<T>().await?),
            StatusCode::NOT_FOUND => Err(match lookup {
                Lookup::Repo => GrError::RepoNotFound(repo.full_name()),
                Lookup::Release(tag) => GrError::ReleaseNotFound {
                    repo: repo.full_name(),
                    tag: tag.to_string(),
                },
            }),
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => Err(GrError::Generic(format!(
                "API request to {url} was refused ({status}); the rate limit may be exhausted, set GITHUB_TOKEN/GITLAB_TOKEN"
            ))),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(GrError::Generic(format!(
                    "API request to {url} failed with {status}: {body}"
                )))
            }
        }
    }

    async fn github_repo_info(&self, repo: &RepoId) -> Result<RepoInfo> {
        let url = format!("{}/repos/{}/{}", self.github_api_url, repo.owner, repo.repo);
        let r: GithubRepo = self
            .get_json(&url, self.github_token.as_deref(), repo, Lookup::Repo)
            .await?;
        Ok(RepoInfo {
            full_name: r.full_name,
            description: r.description,
            topics: r.topics,
            language: r.language,
            stars: r.stargazers_count,
            forks: r.forks_count,
            url: r.html_url,
            updated_at: r.updated_at,
            created_at: r.created_at,
            open_issues: r.open_issues_count,
            visibility: r.visibility,
            archived: r.archived,
        })
    }

    async fn github_release(&self, repo: &RepoId, tag: &str) -> Result<Release> {
        let base = format!("{}/repos/{}/{}/releases", self.github_api_url, repo.owner, repo.repo);
        let token = self.github_token.as_deref();
        if PRERELEASE_TAGS.contains(&tag) {
            let url = format!("{base}?per_page={RELEASES_PER_PAGE}");
            let releases: Vec<GithubRelease> =
                self.get_json(&url, token, repo, Lookup::Release(tag)).await?;
            return releases
                .into_iter()
                .find(|r| r.prerelease)
                .map(Release::from)
                .ok_or_else(|| GrError::ReleaseNotFound {
                    repo: repo.full_name(),
                    tag: tag.to_string(),
                });
        }
        let url = if tag == getrelease_common::model::LATEST_TAG {
            format!("{base}/latest")
        } else {
            format!("{base}/tags/{}", encode(tag))
        };
        let release: GithubRelease = self.get_json(&url, token, repo, Lookup::Release(tag)).await?;
        Ok(release.into())
    }

    fn gitlab_project_url(&self, repo: &RepoId) -> String {
        format!("{}/projects/{}", self.gitlab_api_url, encode(&repo.full_name()))
    }

    async fn gitlab_repo_info(&self, repo: &RepoId) -> Result<RepoInfo> {
        let url = self.gitlab_project_url(repo);
        let token = self.gitlab_token.as_deref();
        let p: GitlabProject = self.get_json(&url, token, repo, Lookup::Repo).await?;
        let language = match self
            .get_json::<HashMap<String, f64>>(&format!("{url}/languages"), token, repo, Lookup::Repo)
            .await
        {
            Ok(languages) => languages
                .into_iter()
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(name, _)| name),
            Err(e) => {
                debug!("Could not query languages for {}: {}", repo, e);
                None
            }
        };
        Ok(RepoInfo {
            full_name: p.path_with_namespace,
            description: p.description,
            topics: p.topics,
            language,
            stars: p.star_count,
            forks: p.forks_count,
            url: p.web_url,
            updated_at: p.last_activity_at,
            created_at: p.created_at,
            open_issues: p.open_issues_count,
            visibility: p.visibility,
            archived: p.archived,
        })
    }

    async fn gitlab_release(&self, repo: &RepoId, tag: &str) -> Result<Release> {
        if PRERELEASE_TAGS.contains(&tag) {
            return Err(GrError::Validation(format!(
                "pre-release lookup is not supported for GitLab project {repo}"
            )));
        }
        let url = if tag == getrelease_common::model::LATEST_TAG {
            format!("{}/releases/permalink/latest", self.gitlab_project_url(repo))
        } else {
            format!("{}/releases/{}", self.gitlab_project_url(repo), encode(tag))
        };
        let release: GitlabRelease = self
            .get_json(&url, self.gitlab_token.as_deref(), repo, Lookup::Release(tag))
            .await?;
        Ok(release.into())
    }
}

fn encode(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

fn is_not_found(err: &GrError) -> bool {
    matches!(
        err,
        GrError::RepoNotFound(_) | GrError::ReleaseNotFound { .. }
    )
}

impl MetadataProvider for ForgeClient {
    async fn repo_info(&self, repo: &RepoId) -> Result<RepoInfo> {
        match repo.forge {
            Forge::GitHub => self.github_repo_info(repo).await,
            Forge::GitLab => self.gitlab_repo_info(repo).await,
            Forge::Unknown => match self.github_repo_info(repo).await {
                Err(e) if is_not_found(&e) => {
                    debug!("{} not found on GitHub, trying GitLab", repo);
                    self.gitlab_repo_info(repo).await.map_err(|_| e)
                }
                other => other,
            },
        }
    }

    async fn release(&self, repo: &RepoId, tag: &str) -> Result<Release> {
        match repo.forge {
            Forge::GitHub => self.github_release(repo, tag).await,
            Forge::GitLab => self.gitlab_release(repo, tag).await,
            Forge::Unknown => match self.github_release(repo, tag).await {
                Err(e) if is_not_found(&e) => {
                    debug!("No release {} for {} on GitHub, trying GitLab", tag, repo);
                    self.gitlab_release(repo, tag).await.map_err(|_| e)
                }
                other => other,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn github_release_json_maps_to_assets() {
        let json = r#"{
            "tag_name": "v0.44.1",
            "published_at": "2023-12-01T00:00:00Z",
            "prerelease": false,
            "assets": [
                {"name": "fzf-0.44.1-linux_amd64.tar.gz",
                 "browser_download_url": "https://github.com/junegunn/fzf/releases/download/v0.44.1/fzf-0.44.1-linux_amd64.tar.gz",
                 "size": 1234}
            ]
        }"#;
        let release: Release = serde_json::from_str::<GithubRelease>(json).unwrap().into();
        assert_eq!(release.tag, "v0.44.1");
        assert_eq!(release.assets.len(), 1);
        assert_eq!(release.assets[0].size, 1234);
        assert!(release.assets[0].download_url.ends_with("linux_amd64.tar.gz"));
    }

    #[test]
    fn gitlab_release_prefers_direct_asset_url() {
        let json = r#"{
            "tag_name": "9.0.0",
            "released_at": "2023-11-01T00:00:00Z",
            "assets": {"links": [
                {"name": "tool-linux.tar.gz", "url": "https://gitlab.com/x/-/package/1",
                 "direct_asset_url": "https://gitlab.com/x/-/releases/9.0.0/downloads/tool-linux.tar.gz"},
                {"name": "tool-mac.zip", "url": "https://gitlab.com/x/mac.zip"}
            ]}
        }"#;
        let release: Release = serde_json::from_str::<GitlabRelease>(json).unwrap().into();
        assert_eq!(release.assets[0].download_url, "https://gitlab.com/x/-/releases/9.0.0/downloads/tool-linux.tar.gz");
        assert_eq!(release.assets[1].download_url, "https://gitlab.com/x/mac.zip");
        assert_eq!(release.assets[1].size, 0);
    }

    #[test]
    fn project_ids_are_url_encoded() {
        assert_eq!(encode("graphviz/graphviz"), "graphviz%2Fgraphviz");
    }
}
