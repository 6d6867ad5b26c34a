//! Transport session persistence
//!
//! Stores the opaque session blob a transport hands back after login so the
//! next start can resume without re-authenticating.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::json_file::{read_json, write_json, PersistError};

#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    session: String,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved session, if any
    pub fn load(&self) -> Result<Option<String>, PersistError> {
        let file: Option<SessionFile> = read_json(&self.path)?;
        Ok(file.map(|f| f.session).filter(|s| !s.is_empty()))
    }

    pub fn save(&self, session: &str) -> Result<(), PersistError> {
        write_json(
            &self.path,
            &SessionFile {
                session: session.to_string(),
            },
        )?;
        tracing::info!("Session saved to {}", self.path.display());
        Ok(())
    }
}
