//! Durable storage for documents.
//!
//! Saves go through a temporary file in the destination directory followed by
//! a rename, so readers never observe a half-written document.

use std::fs;
use std::io::Write as _;
use std::path::Path;

use serde_yaml::Value;

use crate::error::StoreError;

/// Load and parse a document. An empty file is an error.
pub fn load(path: &Path) -> Result<Value, StoreError> {
    let content = fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: Value = serde_yaml::from_str(&content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if doc.is_null() {
        return Err(StoreError::Empty {
            path: path.to_path_buf(),
        });
    }
    tracing::debug!("loaded {}", path.display());
    Ok(doc)
}

/// Like [`load`], but a missing or empty file yields `None`.
pub fn load_optional(path: &Path) -> Result<Option<Value>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    match load(path) {
        Ok(doc) => Ok(Some(doc)),
        Err(StoreError::Empty { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Serialize `doc` and atomically replace `path` with it.
pub fn save(path: &Path, doc: &Value) -> Result<(), StoreError> {
    let text = serde_yaml::to_string(doc)?;
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(write_err)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(text.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    tracing::debug!("saved {}", path.display());
    Ok(())
}
