//! On-disk JSON dataset helpers.
//!
//! All persistence is full-file rewrite of pretty-printed JSON; writes are
//! synchronous and fail loudly. Backups rename the offending file in place
//! with a tag and a filesystem-safe UTC timestamp.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{StoreError, StoreResult};
use crate::models::now_second_precision;

/// Timestamp used in backup file names: colons replaced by hyphens.
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%SZ";

/// Read and parse a JSON file. `Ok(None)` when the file does not exist;
/// `StoreError::Corrupt` when it exists but is not valid JSON.
pub(crate) fn read_json(path: &Path) -> StoreResult<Option<Value>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(err) => Err(StoreError::Corrupt(format!(
            "invalid JSON in {}: {err}",
            path.display()
        ))),
    }
}

/// Write a JSON document, creating parent directories as needed.
pub(crate) fn write_json(path: &Path, value: &Value) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let rendered = serde_json::to_string_pretty(value)?;
    fs::write(path, rendered)?;
    Ok(())
}

/// Rename a file to `<name>.<tag>.<timestamp>` next to the original.
pub(crate) fn backup_file(path: &Path, tag: &str) -> StoreResult<PathBuf> {
    let timestamp = now_second_precision()
        .format(BACKUP_TIMESTAMP_FORMAT)
        .to_string();
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let backup_path = path.with_file_name(format!("{file_name}.{tag}.{timestamp}"));
    fs::rename(path, &backup_path)?;
    log::warn!("renamed {} to {}", path.display(), backup_path.display());
    Ok(backup_path)
}
