//! Message Classifier
//!
//! Decides which chain a signal talks about and which alert format it uses.
//! Pure substring tests, first match wins.

use super::token::{Chain, SignalType};

/// Marker present in KOL buy alerts
pub const KOL_BUY_MARKER: &str = "KOL Buy";
/// Marker present in all-time-high price alerts
pub const ATH_PRICE_MARKER: &str = "ATH Price";

/// Chains checked in order; Solana is the fallback
const CHAIN_MARKERS: &[(&str, Chain)] = &[
    ("Ethereum", Chain::Ethereum),
    ("Binance Smart Chain", Chain::BinanceSmartChain),
    ("Ton", Chain::Ton),
];

/// Outcome of classifying a raw message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub chain: Chain,
    pub signal_type: SignalType,
}

/// Classify a raw message. Never fails.
pub fn classify(text: &str) -> Classification {
    Classification {
        chain: detect_chain(text),
        signal_type: detect_type(text),
    }
}

pub fn detect_chain(text: &str) -> Chain {
    CHAIN_MARKERS
        .iter()
        .find(|(marker, _)| text.contains(marker))
        .map(|(_, chain)| *chain)
        .unwrap_or_default()
}

pub fn detect_type(text: &str) -> SignalType {
    if text.contains(KOL_BUY_MARKER) {
        SignalType::KolBuy
    } else if text.contains(ATH_PRICE_MARKER) {
        SignalType::AthPrice
    } else {
        SignalType::Unknown
    }
}
