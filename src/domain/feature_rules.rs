//! Strategy feature rules
//!
//! Phrase table that turns a stored analysis report into a
//! `StrategyFeatureRecord`. Reports are lowercased before matching.
//! Bump `RULESET_VERSION` whenever a phrase list changes so archived
//! meta-analyses can be traced back to the rules that produced them.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::trade_log::TradeRecord;

pub const RULESET_VERSION: &str = "1";

/// Placeholder for values the report or log does not provide
pub const UNKNOWN: &str = "unknown";

static RISK_SCORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"风险评估：(\d+)").expect("risk score pattern is a valid literal"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunityMood {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDecision {
    Buy,
    Pass,
}

/// How a rule's phrases combine
#[derive(Debug, Clone, Copy)]
pub enum PhraseMatch {
    Any(&'static [&'static str]),
    All(&'static [&'static str]),
}

impl PhraseMatch {
    /// `text` must already be lowercased
    pub fn matches(&self, text: &str) -> bool {
        match self {
            PhraseMatch::Any(phrases) => phrases.iter().any(|p| text.contains(p)),
            PhraseMatch::All(phrases) => phrases.iter().all(|p| text.contains(p)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    NegativeNetInflow,
    HighVolatility,
    DeveloperSellAll,
    LowLiquidity,
    KolBuying,
    HasProfitTarget,
    HasStopLoss,
    HasBatchSelling,
}

#[derive(Debug, Clone, Copy)]
pub struct FlagRule {
    pub flag: Flag,
    pub phrases: PhraseMatch,
}

pub const POSITIVE_MOOD: PhraseMatch = PhraseMatch::Any(&["社区情绪积极", "社区反应良好"]);
pub const NEGATIVE_MOOD: PhraseMatch = PhraseMatch::Any(&["社区情绪消极", "社区反应不佳"]);
pub const BUY_DECISION: PhraseMatch = PhraseMatch::Any(&["建议购买"]);

pub const FLAG_RULES: &[FlagRule] = &[
    FlagRule { flag: Flag::NegativeNetInflow, phrases: PhraseMatch::Any(&["净流入为负", "资金流出"]) },
    FlagRule {
        flag: Flag::HighVolatility,
        phrases: PhraseMatch::Any(&["高波动性", "波动性高", "极高的波动性"]),
    },
    FlagRule { flag: Flag::DeveloperSellAll, phrases: PhraseMatch::Any(&["sell all", "开发者卖出"]) },
    FlagRule { flag: Flag::LowLiquidity, phrases: PhraseMatch::Any(&["流动性低", "流动性较低"]) },
    FlagRule { flag: Flag::KolBuying, phrases: PhraseMatch::All(&["kol", "买入"]) },
    FlagRule { flag: Flag::HasProfitTarget, phrases: PhraseMatch::Any(&["止盈点", "止盈价格"]) },
    FlagRule { flag: Flag::HasStopLoss, phrases: PhraseMatch::Any(&["止损点", "止损价格"]) },
    FlagRule { flag: Flag::HasBatchSelling, phrases: PhraseMatch::Any(&["分批卖出", "分批出售"]) },
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlags {
    pub has_negative_net_inflow: bool,
    pub has_high_volatility: bool,
    pub has_developer_sell_all: bool,
    pub has_low_liquidity: bool,
    #[serde(rename = "hasKOLBuying")]
    pub has_kol_buying: bool,
    pub has_profit_target: bool,
    pub has_stop_loss: bool,
    pub has_batch_selling: bool,
}

impl FeatureFlags {
    fn set(&mut self, flag: Flag) {
        match flag {
            Flag::NegativeNetInflow => self.has_negative_net_inflow = true,
            Flag::HighVolatility => self.has_high_volatility = true,
            Flag::DeveloperSellAll => self.has_developer_sell_all = true,
            Flag::LowLiquidity => self.has_low_liquidity = true,
            Flag::KolBuying => self.has_kol_buying = true,
            Flag::HasProfitTarget => self.has_profit_target = true,
            Flag::HasStopLoss => self.has_stop_loss = true,
            Flag::HasBatchSelling => self.has_batch_selling = true,
        }
    }
}

/// Heuristic features of one past trade, sent to the meta-analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyFeatureRecord {
    pub token_symbol: String,
    pub timestamp: String,
    pub community_mood: CommunityMood,
    pub decision: TradeDecision,
    /// Captured 1-10 score, or `unknown`
    pub risk_level: String,
    #[serde(flatten)]
    pub flags: FeatureFlags,
    pub trading_result: String,
    pub buy_amount: String,
    pub token_address: String,
}

impl StrategyFeatureRecord {
    pub fn derive(trade: &TradeRecord) -> Self {
        let analysis = trade.analysis_result.to_lowercase();

        let community_mood = if POSITIVE_MOOD.matches(&analysis) {
            CommunityMood::Positive
        } else if NEGATIVE_MOOD.matches(&analysis) {
            CommunityMood::Negative
        } else {
            CommunityMood::Neutral
        };

        let decision = if BUY_DECISION.matches(&analysis) {
            TradeDecision::Buy
        } else {
            TradeDecision::Pass
        };

        let risk_level = RISK_SCORE_RE
            .captures(&analysis)
            .map(|caps| caps[1].to_string())
            .unwrap_or_else(|| UNKNOWN.to_string());

        let mut flags = FeatureFlags::default();
        for rule in FLAG_RULES.iter().filter(|r| r.phrases.matches(&analysis)) {
            flags.set(rule.flag);
        }

        Self {
            token_symbol: trade.token_symbol.clone(),
            timestamp: trade.timestamp.to_rfc3339(),
            community_mood,
            decision,
            risk_level,
            flags,
            trading_result: trade
                .trading_result
                .clone()
                .unwrap_or_else(|| UNKNOWN.to_string()),
            buy_amount: trade.buy_amount.clone(),
            token_address: trade.token_address.clone(),
        }
    }
}

/// Derive features for a whole trade history
pub fn derive_all(trades: &[TradeRecord]) -> Vec<StrategyFeatureRecord> {
    trades.iter().map(StrategyFeatureRecord::derive).collect()
}
