//! Trade Log
//!
//! Bounded, append-only history of dispatched `/buy` commands. A record means
//! the command was sent, not that the trade filled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::json_file::{read_json_vec, write_json, PersistError};
use super::token::TokenInfo;

/// Default trade log file name
pub const DEFAULT_TRADE_FILE: &str = "trades.json";
/// Records kept before the oldest are dropped
pub const DEFAULT_TRADE_CAPACITY: usize = 100;

/// One dispatched trade command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub token_address: String,
    pub token_name: String,
    pub token_symbol: String,
    pub buy_amount: String,
    /// Raw signal the trade was based on
    pub old_message: String,
    /// Full provider report
    pub analysis_result: String,
    /// Filled in by hand or an external observer; never by the bot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trading_result: Option<String>,
}

impl TradeRecord {
    pub fn new(token: &TokenInfo, buy_amount: &str, analysis: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            token_address: token.address.clone(),
            token_name: token.name.clone(),
            token_symbol: token.symbol.clone(),
            buy_amount: buy_amount.to_string(),
            old_message: token.raw_message.clone(),
            analysis_result: analysis.to_string(),
            trading_result: None,
        }
    }
}

/// File-backed trade log with FIFO eviction
///
/// Each append reloads the whole file, pushes, trims to capacity and rewrites
/// it. The internal lock makes that cycle the single write path, so
/// concurrent appends from overlapping signals cannot lose records.
#[derive(Debug)]
pub struct TradeRecorder {
    path: PathBuf,
    capacity: usize,
    write_lock: Mutex<()>,
}

impl TradeRecorder {
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity: capacity.max(1),
            write_lock: Mutex::new(()),
        }
    }

    /// Recorder for `<data_dir>/trades.json`
    pub fn in_dir(data_dir: &Path, capacity: usize) -> Self {
        Self::new(data_dir.join(DEFAULT_TRADE_FILE), capacity)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a record, returning the stored count afterwards
    pub fn append(&self, record: TradeRecord) -> Result<usize, PersistError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| PersistError::LockError(e.to_string()))?;

        let mut trades: Vec<TradeRecord> = read_json_vec(&self.path)?;
        trades.push(record);

        if trades.len() > self.capacity {
            let excess = trades.len() - self.capacity;
            trades.drain(..excess);
        }

        write_json(&self.path, &trades)?;
        tracing::info!("Trade record saved to {} ({} stored)", self.path.display(), trades.len());
        Ok(trades.len())
    }

    /// Every stored record, oldest first
    pub fn load_all(&self) -> Result<Vec<TradeRecord>, PersistError> {
        read_json_vec(&self.path)
    }
}
