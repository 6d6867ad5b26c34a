//! Strategy analysis archive
//!
//! Keeps every meta-analysis narrative in an unbounded history file and the
//! most recent one in its own file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::json_file::{read_json, read_json_vec, write_json, PersistError};

pub const LATEST_ANALYSIS_FILE: &str = "trade_analysis.json";
pub const ANALYSIS_HISTORY_FILE: &str = "trade_analysis_history.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyAnalysis {
    pub timestamp: DateTime<Utc>,
    pub total_trades: usize,
    /// Narrative returned by the provider
    pub analysis_result: String,
    #[serde(default)]
    pub ruleset_version: String,
}

/// History plus latest-record files
///
/// Clones share one write lock, so overlapping evolutions in the same process
/// append in turn instead of overwriting each other's history.
#[derive(Debug, Clone)]
pub struct AnalysisArchive {
    latest_path: PathBuf,
    history_path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl AnalysisArchive {
    pub fn new(latest_path: impl Into<PathBuf>, history_path: impl Into<PathBuf>) -> Self {
        Self {
            latest_path: latest_path.into(),
            history_path: history_path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(
            data_dir.join(LATEST_ANALYSIS_FILE),
            data_dir.join(ANALYSIS_HISTORY_FILE),
        )
    }

    /// Append to history, then overwrite the latest record
    pub fn store(&self, analysis: &StrategyAnalysis) -> Result<(), PersistError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| PersistError::LockError(e.to_string()))?;

        let mut history: Vec<StrategyAnalysis> = read_json_vec(&self.history_path)?;
        history.push(analysis.clone());
        write_json(&self.history_path, &history)?;
        write_json(&self.latest_path, analysis)?;

        tracing::info!(
            "Strategy analysis archived ({} entries in {})",
            history.len(),
            self.history_path.display()
        );
        Ok(())
    }

    pub fn latest(&self) -> Result<Option<StrategyAnalysis>, PersistError> {
        read_json(&self.latest_path)
    }

    pub fn history(&self) -> Result<Vec<StrategyAnalysis>, PersistError> {
        read_json_vec(&self.history_path)
    }
}
