// getrelease-common/src/fs.rs
//! Small filesystem primitives shared by the config writer and the install store.
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, error};

use crate::error::{GrError, Result};

/// Atomically writes data to a file using a temporary file in the same directory.
pub fn atomic_write_file(path: &Path, content: &[u8]) -> Result<()> {
    let dir = path.parent().ok_or_else(|| {
        GrError::Generic(format!(
            "Cannot get parent directory for {}",
            path.display()
        ))
    })?;
    fs::create_dir_all(dir)?;

    let mut temp_file = NamedTempFile::new_in(dir)?;
    debug!(
        "Atomically writing {} bytes to {} via temp file {}",
        content.len(),
        path.display(),
        temp_file.path().display()
    );
    temp_file.write_all(content)?;
    temp_file.flush()?;
    temp_file.as_file().sync_all()?;

    temp_file.persist(path).map_err(|e| {
        error!(
            "Failed to persist temporary file over {}: {}",
            path.display(),
            e.error
        );
        GrError::Io(Arc::new(e.error))
    })?;
    Ok(())
}

/// Pretty-prints `data` as JSON and writes it atomically.
pub fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(data)?;
    atomic_write_file(path, &bytes)
}
