//! Token metadata extracted from a signal message
//!
//! Every scalar is kept as the display string found in the message
//! (`$22.7K`, `13.47%`, `253.08 SOL`). Nothing is normalized to numbers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Blockchain the signal refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Chain {
    #[default]
    Solana,
    Ethereum,
    #[serde(rename = "Binance Smart Chain")]
    BinanceSmartChain,
    Ton,
}

impl Chain {
    /// Name as it appears inside signal text
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Solana => "Solana",
            Chain::Ethereum => "Ethereum",
            Chain::BinanceSmartChain => "Binance Smart Chain",
            Chain::Ton => "Ton",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of alert a message carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignalType {
    KolBuy,
    AthPrice,
    #[default]
    Unknown,
}

impl SignalType {
    pub fn is_known(&self) -> bool {
        !matches!(self, SignalType::Unknown)
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalType::KolBuy => write!(f, "kolBuy"),
            SignalType::AthPrice => write!(f, "athPrice"),
            SignalType::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetInflow {
    /// e.g. `$-22.7K`
    pub amount: String,
    /// e.g. `-154.7217 Sol`
    pub sol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KolActivity {
    pub buys: String,
    pub sells: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceChange {
    #[serde(rename = "5m")]
    pub m5: String,
    #[serde(rename = "1h")]
    pub h1: String,
    #[serde(rename = "6h")]
    pub h6: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Liquidity {
    pub sol: String,
    pub usd: String,
    pub burn_rate: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Security {
    pub no_mint: bool,
    pub blacklist: bool,
    pub burnt: bool,
    pub top10_percent: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Developer {
    /// e.g. `Sell All`, `Add Liquidity`
    pub status: String,
    pub burnt: String,
    pub burn_rate: String,
}

/// Structured view of one signal message
///
/// `signal_type == Unknown` means only `chain` and `raw_message` are
/// meaningful; every other field stays at its default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub chain: Chain,
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub name: String,
    pub symbol: String,
    pub address: String,
    pub net_inflow: NetInflow,
    pub kol_activity: KolActivity,
    pub price_change: PriceChange,
    pub transactions: String,
    pub volume: String,
    pub market_cap: String,
    pub liquidity: Liquidity,
    pub holders: String,
    pub open_time: String,
    pub security: Security,
    pub developer: Developer,
    pub raw_message: String,
}

impl TokenInfo {
    /// Bare record for a message no extractor handles
    pub fn unknown(chain: Chain, raw_message: &str) -> Self {
        Self {
            chain,
            signal_type: SignalType::Unknown,
            raw_message: raw_message.to_string(),
            ..Default::default()
        }
    }

    pub fn is_actionable(&self) -> bool {
        self.signal_type.is_known()
    }

    /// Short label for log lines
    pub fn label(&self) -> String {
        if self.symbol.is_empty() {
            self.address.clone()
        } else {
            format!("{} ({})", self.symbol, self.address)
        }
    }
}
