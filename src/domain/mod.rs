//! Domain Layer - Signal parsing, verdicts and trade history
//!
//! Pure types and rules with no network access. File persistence goes
//! through `json_file`.
//!
//! - `classifier` / `extractor`: turn a raw alert into `TokenInfo`
//! - `analysis`: read the buy/pass verdict out of a provider reply
//! - `trade_log`: bounded history of dispatched `/buy` commands
//! - `feature_rules`: deterministic features derived from past trades
//! - `analysis_archive`: latest and historical strategy analyses
//! - `session_store`: saved transport session blob

pub mod token;
pub mod classifier;
pub mod extractor;
pub mod analysis;
pub mod json_file;
pub mod trade_log;
pub mod feature_rules;
pub mod analysis_archive;
pub mod session_store;

pub use token::{Chain, SignalType, TokenInfo};
pub use classifier::{classify, Classification};
pub use extractor::parse_message;
pub use analysis::AnalysisResult;
pub use json_file::PersistError;
pub use trade_log::{TradeRecord, TradeRecorder};
pub use feature_rules::{derive_all, StrategyFeatureRecord};
pub use analysis_archive::{AnalysisArchive, StrategyAnalysis};
pub use session_store::SessionStore;
