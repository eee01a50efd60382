// getrelease-net/src/http.rs
use std::fs;
use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use getrelease_common::error::{GrError, Result};
use getrelease_common::provider::{AssetFetcher, ProgressReporter};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use tokio::fs::File as TokioFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};

use crate::validation::validate_url;

const DOWNLOAD_TIMEOUT_SECS: u64 = 600;
const CONNECT_TIMEOUT_SECS: u64 = 30;
pub(crate) const USER_AGENT_STRING: &str =
    concat!("getrelease/", env!("CARGO_PKG_VERSION"), " (Rust)");

pub fn build_http_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    Client::builder()
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| GrError::Generic(format!("Failed to build HTTP client: {e}")))
}

/// Streams release assets to disk.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
        })
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path, progress: &dyn ProgressReporter) -> Result<u64> {
        validate_url(url)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                GrError::Generic(format!(
                    "Failed to create download directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let temp_path = dest.with_file_name(format!(".{}.download", file_label(dest)));
        debug!("Downloading {} to temporary path: {}", url, temp_path.display());
        if temp_path.exists() {
            if let Err(e) = fs::remove_file(&temp_path) {
                warn!(
                    "Could not remove existing temporary file {}: {}",
                    temp_path.display(),
                    e
                );
            }
        }

        let download_err =
            |reason: String| GrError::DownloadError(file_label(dest), url.to_string(), reason);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/octet-stream")
            .send()
            .await
            .map_err(|e| download_err(format!("HTTP request failed: {e}")))?;
        let status = response.status();
        debug!("Received HTTP status: {} for {}", status, url);
        if !status.is_success() {
            error!("HTTP error {} for URL {}", status, url);
            let reason = match status {
                StatusCode::NOT_FOUND => "Resource not found (404)".to_string(),
                StatusCode::FORBIDDEN => "Access forbidden (403)".to_string(),
                other => format!("HTTP error {other}"),
            };
            return Err(download_err(reason));
        }

        let total = response.content_length();
        progress.on_start(&file_label(dest), total);

        let result: Result<u64> = async {
            let mut temp_file = TokioFile::create(&temp_path).await?;
            let mut stream = response.bytes_stream();
            let mut written: u64 = 0;
            while let Some(chunk) = stream.next().await {
                let chunk =
                    chunk.map_err(|e| download_err(format!("Failed to read response body: {e}")))?;
                temp_file.write_all(&chunk).await?;
                written += chunk.len() as u64;
                progress.on_progress(written, total);
            }
            temp_file.flush().await?;
            temp_file.sync_all().await?;
            Ok(written)
        }
        .await;
        progress.on_finish();

        let written = match result {
            Ok(n) => n,
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                return Err(e);
            }
        };

        if let Some(expected) = total {
            if expected != written {
                let _ = fs::remove_file(&temp_path);
                return Err(download_err(format!(
                    "Truncated download: expected {expected} bytes, got {written}"
                )));
            }
        }

        fs::rename(&temp_path, dest).map_err(|e| {
            GrError::Generic(format!(
                "Failed to move temp file {} to {}: {}",
                temp_path.display(),
                dest.display(),
                e
            ))
        })?;
        debug!("Moved downloaded file to final location: {}", dest.display());
        Ok(written)
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        validate_url(url)?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GrError::DownloadError(
                url.rsplit('/').next().unwrap_or(url).to_string(),
                url.to_string(),
                format!("HTTP error {status}"),
            ));
        }
        Ok(response.text().await?)
    }
}
