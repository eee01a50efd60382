// getrelease-net/src/validation.rs
use std::fs::File;
use std::io;
use std::path::Path;

use getrelease_common::error::{GrError, Result};
use sha2::{Digest, Sha256};
use url::Url;

/// Computes the hex-encoded SHA-256 of a file.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let bytes_copied = io::copy(&mut file, &mut hasher)?;
    let actual = hex::encode(hasher.finalize());
    tracing::debug!(
        "Calculated SHA256 of {}: {} ({} bytes read)",
        path.display(),
        actual,
        bytes_copied
    );
    Ok(actual)
}

pub fn verify_checksum(path: &Path, expected: &str) -> Result<()> {
    tracing::debug!("Verifying checksum for: {}", path.display());
    let actual = sha256_file(path)?;
    tracing::debug!("Expected SHA256:   {}", expected);
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(GrError::ChecksumMismatch(format!(
            "Checksum mismatch for {}: expected {}, got {}",
            path.display(),
            expected,
            actual
        )))
    }
}

/// Finds the checksum for `file_name` in the text of a checksum file.
///
/// Understands the `sha256sum` layout (`<hex>  [*]<name>`, with or without a
/// leading path) and sidecar files that hold a bare digest.
pub fn find_checksum(checksums: &str, file_name: &str) -> Option<String> {
    let lines = checksums
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'));

    let mut bare_digest: Option<String> = None;
    let mut count = 0usize;
    for line in lines {
        count += 1;
        let mut fields = line.split_whitespace();
        let Some(digest) = fields.next() else { continue };
        match fields.next() {
            Some(name) => {
                let name = name.trim_start_matches('*');
                let base = name.rsplit('/').next().unwrap_or(name);
                if base == file_name && is_sha256_hex(digest) {
                    return Some(digest.to_ascii_lowercase());
                }
            }
            None if is_sha256_hex(digest) => bare_digest = Some(digest.to_ascii_lowercase()),
            None => {}
        }
    }
    if count == 1 {
        bare_digest
    } else {
        None
    }
}

fn is_sha256_hex(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Validates a URL, ensuring it uses the HTTPS scheme.
pub fn validate_url(url_str: &str) -> Result<()> {
    let url = Url::parse(url_str)
        .map_err(|e| GrError::Validation(format!("Failed to parse URL '{url_str}': {e}")))?;
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(GrError::Validation(format!(
            "Invalid URL scheme for '{}': Must be https, but got '{}'",
            url_str,
            url.scheme()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn checksum_of_known_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello");
        std::fs::write(&path, b"hello").unwrap();
        verify_checksum(&path, DIGEST).unwrap();
        assert!(matches!(
            verify_checksum(&path, &"0".repeat(64)),
            Err(GrError::ChecksumMismatch(_))
        ));
    }

    #[test]
    fn finds_entry_in_combined_checksum_file() {
        let text = format!(
            "{}  tool-darwin-amd64.tar.gz\n{DIGEST} *dist/tool-linux-amd64.tar.gz\n",
            "a".repeat(64)
        );
        assert_eq!(
            find_checksum(&text, "tool-linux-amd64.tar.gz").as_deref(),
            Some(DIGEST)
        );
        assert_eq!(find_checksum(&text, "tool-windows.zip"), None);
    }

    #[test]
    fn accepts_bare_sidecar_digest() {
        assert_eq!(find_checksum(&format!("{DIGEST}\n"), "x").as_deref(), Some(DIGEST));
    }

    #[test]
    fn rejects_plain_http() {
        assert!(validate_url("https://github.com/a/b").is_ok());
        assert!(matches!(
            validate_url("http://example.com/a"),
            Err(GrError::Validation(_))
        ));
    }
}
