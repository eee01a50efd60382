// getrelease-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GrError, Result};
use crate::fs::write_json_atomic;

const APP_DIR_NAME: &str = "getrelease";
const CONFIG_FILE_NAME: &str = "config.json";
const STORE_FILE_NAME: &str = "installed.json";
const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_GITLAB_API_URL: &str = "https://gitlab.com/api/v4";

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the symlinks are created in.
    pub bin_dir: PathBuf,
    /// Downloaded assets.
    pub cache_dir: PathBuf,
    /// Extracted assets; binaries live below this directory.
    pub data_dir: PathBuf,
    /// Install records, config file and logs.
    pub state_dir: PathBuf,
    pub github_token: Option<String>,
    pub gitlab_token: Option<String>,
    pub github_api_url: String,
    pub gitlab_api_url: String,
}

/// On-disk overrides stored in `<state_dir>/config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitlab_token: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading getrelease configuration");
        let home = dirs::home_dir().ok_or_else(|| {
            GrError::Config("could not determine the home directory".to_string())
        })?;

        let state_dir = env_path("GETRELEASE_STATE_DIR").unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| home.join(".config"))
                .join(APP_DIR_NAME)
        });

        let mut config = Self {
            bin_dir: home.join(".local").join("bin"),
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| home.join(".cache"))
                .join(APP_DIR_NAME),
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| home.join(".local").join("share"))
                .join(APP_DIR_NAME),
            state_dir,
            github_token: None,
            gitlab_token: None,
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            gitlab_api_url: DEFAULT_GITLAB_API_URL.to_string(),
        };

        let file_path = config.config_file_path();
        if file_path.is_file() {
            debug!("Reading config overrides from {}", file_path.display());
            let raw = std::fs::read(&file_path)?;
            let file: ConfigFile = serde_json::from_slice(&raw).map_err(|e| {
                GrError::Config(format!("invalid config file {}: {e}", file_path.display()))
            })?;
            config.apply_file(file);
        }

        if let Some(p) = env_path("GETRELEASE_BIN_DIR") {
            config.bin_dir = p;
        }
        if let Some(p) = env_path("GETRELEASE_CACHE_DIR") {
            config.cache_dir = p;
        }
        if let Some(p) = env_path("GETRELEASE_DATA_DIR") {
            config.data_dir = p;
        }
        if let Some(token) = env_string("GITHUB_TOKEN") {
            config.github_token = Some(token);
        }
        if let Some(token) = env_string("GITLAB_TOKEN") {
            config.gitlab_token = Some(token);
        }
        if let Some(url) = env_string("GETRELEASE_GITHUB_API_URL") {
            config.github_api_url = url;
        }
        if let Some(url) = env_string("GETRELEASE_GITLAB_API_URL") {
            config.gitlab_api_url = url;
        }

        if config.github_token.is_none() {
            debug!("GITHUB_TOKEN not set; GitHub API calls are limited to 60/hr");
        }
        debug!("Configuration loaded: {:?}", config.redacted());
        Ok(config)
    }

    /// A config rooted entirely below `root`, used by tests and `--root`-style setups.
    pub fn with_root(root: &Path) -> Self {
        Self {
            bin_dir: root.join("bin"),
            cache_dir: root.join("cache"),
            data_dir: root.join("data"),
            state_dir: root.join("state"),
            github_token: None,
            gitlab_token: None,
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            gitlab_api_url: DEFAULT_GITLAB_API_URL.to_string(),
        }
    }

    pub fn apply_file(&mut self, file: ConfigFile) {
        if let Some(p) = file.bin_dir {
            self.bin_dir = p;
        }
        if let Some(p) = file.cache_dir {
            self.cache_dir = p;
        }
        if let Some(p) = file.data_dir {
            self.data_dir = p;
        }
        if file.github_token.is_some() {
            self.github_token = file.github_token;
        }
        if file.gitlab_token.is_some() {
            self.gitlab_token = file.gitlab_token;
        }
    }

    /// Writes `file` merged over the existing config file.
    pub fn save_file(&self, file: &ConfigFile) -> Result<()> {
        let path = self.config_file_path();
        let mut merged = if path.is_file() {
            let raw = std::fs::read(&path)?;
            serde_json::from_slice::<ConfigFile>(&raw).unwrap_or_else(|e| {
                warn!("Replacing unreadable config file {}: {}", path.display(), e);
                ConfigFile::default()
            })
        } else {
            ConfigFile::default()
        };
        if file.bin_dir.is_some() {
            merged.bin_dir = file.bin_dir.clone();
        }
        if file.cache_dir.is_some() {
            merged.cache_dir = file.cache_dir.clone();
        }
        if file.data_dir.is_some() {
            merged.data_dir = file.data_dir.clone();
        }
        if file.github_token.is_some() {
            merged.github_token = file.github_token.clone();
        }
        if file.gitlab_token.is_some() {
            merged.gitlab_token = file.gitlab_token.clone();
        }
        write_json_atomic(&path, &merged)
    }

    pub fn config_file_path(&self) -> PathBuf {
        self.state_dir.join(CONFIG_FILE_NAME)
    }

    pub fn store_path(&self) -> PathBuf {
        self.state_dir.join(STORE_FILE_NAME)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.state_dir.join("logs")
    }

    /// Deterministic cache location of an asset downloaded for `name` at
    /// `tag`. Downloads without a release tag share the `url` bucket.
    pub fn asset_cache_path(&self, name: &str, tag: &str, file_name: &str) -> PathBuf {
        self.cache_dir
            .join(name)
            .join(cache_bucket(tag))
            .join(file_name)
    }

    /// Directory the assets of `name` are extracted under.
    pub fn extract_root(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    fn redacted(&self) -> Self {
        let mut c = self.clone();
        c.github_token = c.github_token.map(|_| "***".to_string());
        c.gitlab_token = c.gitlab_token.map(|_| "***".to_string());
        c
    }
}

/// A tag as a single path segment.
fn cache_bucket(tag: &str) -> String {
    match tag.trim() {
        "" => "url".to_string(),
        "." | ".." => "_".to_string(),
        t => t.replace(['/', '\\'], "_"),
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env_string(key).map(PathBuf::from)
}
