//! Analysis Result
//!
//! Turns a provider's free-text report into a buy/no-buy verdict.

use serde::Serialize;

use super::token::TokenInfo;

/// Verdict line the prompt asks the model to emit when it recommends buying
pub const BUY_MARKER: &str = "报告结果：建议购买";
/// Verdict line for a pass
pub const PASS_MARKER: &str = "报告结果：建议放弃";
/// Characters of the report kept in `reason`
pub const REASON_MAX_CHARS: usize = 200;

/// AI verdict for one signal
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub should_buy: bool,
    /// Report truncated to 200 chars, `...` appended when cut
    pub reason: String,
    /// Untruncated provider response
    pub full_analysis: String,
    pub token_info: TokenInfo,
}

impl AnalysisResult {
    /// Interpret a provider response for the given token
    pub fn from_response(full_analysis: String, token_info: TokenInfo) -> Self {
        Self {
            should_buy: recommends_buy(&full_analysis),
            reason: summarize(&full_analysis),
            full_analysis,
            token_info,
        }
    }
}

/// Case-insensitive check for the buy verdict marker
pub fn recommends_buy(response: &str) -> bool {
    response.to_lowercase().contains(&BUY_MARKER.to_lowercase())
}

/// First 200 chars of the report, with `...` when longer
pub fn summarize(response: &str) -> String {
    match response.char_indices().nth(REASON_MAX_CHARS) {
        Some((cut, _)) => format!("{}...", &response[..cut]),
        None => response.to_string(),
    }
}
