//! JSON file persistence
//!
//! Whole-file read and whole-file rewrite. Writes go to a sibling temp file
//! first and are renamed into place, so a reader never sees half a file.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum PersistError {
    #[error("Failed to serialize {path}: {reason}")]
    SerializationError { path: String, reason: String },

    #[error("Failed to deserialize {path}: {reason}")]
    DeserializationError { path: String, reason: String },

    #[error("Failed to write {path}: {reason}")]
    WriteError { path: String, reason: String },

    #[error("Failed to read {path}: {reason}")]
    ReadError { path: String, reason: String },

    #[error("Failed to create directory: {0}")]
    DirectoryError(String),

    #[error("Store lock poisoned: {0}")]
    LockError(String),
}

/// Load a JSON value; `Ok(None)` when the file is missing or blank
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).map_err(|e| PersistError::ReadError {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    if content.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| PersistError::DeserializationError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}

/// Load a JSON array, treating a missing file as empty
pub fn read_json_vec<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, PersistError> {
    Ok(read_json(path)?.unwrap_or_default())
}

/// Pretty-print `value` to `path`, replacing the previous content
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PersistError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| PersistError::DirectoryError(format!("{}: {}", parent.display(), e)))?;
        }
    }

    let content = serde_json::to_string_pretty(value).map_err(|e| {
        PersistError::SerializationError {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    })?;

    let tmp = temp_path(path);
    let write_err = |e: std::io::Error| PersistError::WriteError {
        path: path.display().to_string(),
        reason: e.to_string(),
    };
    fs::write(&tmp, content).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(write_err)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
