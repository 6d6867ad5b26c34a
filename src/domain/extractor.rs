//! Field Extractor
//!
//! Pulls token metadata out of KOL-buy and ATH-price alerts. Each field has
//! its own pattern run against the whole message, so one malformed line
//! never hides the others. A field that does not match keeps its default.
//!
//! Captured values never cross a line break.

use once_cell::sync::Lazy;
use regex::Regex;

use super::classifier::{classify, Classification};
use super::token::{SignalType, TokenInfo};

/// Minimum length of a line treated as a contract address
pub const MIN_ADDRESS_LEN: usize = 32;

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("extractor patterns are valid literals")
}

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| pattern(r"\$([^(\n]+)\(([^)\n]+)\)"));
static KOL_TITLE_RE: Lazy<Regex> = Lazy::new(|| pattern(r"KOL Buy ([^!\n]+)!"));
static INFLOW_RE: Lazy<Regex> =
    Lazy::new(|| pattern(r"KOL Inflow净流入:\$([-0-9.]+[KM]?)\(([-0-9.]+) Sol\)"));
static KOL_ACTIVITY_RE: Lazy<Regex> = Lazy::new(|| pattern(r"KOL Buy/Sell:([0-9]+)/([0-9]+)"));
static KOL_PRICE_CHANGE_RE: Lazy<Regex> = Lazy::new(|| {
    pattern(r"📈 5m \| 1h \| 6h: ([^%\n]+)% \| ([^%\n]+)% \| ([^%\n]+)%")
});
static ATH_PRICE_CHANGE_RE: Lazy<Regex> = Lazy::new(|| {
    pattern(r"📈 5m \| 1h \| 6h: ([^%|\n]+)% \| ([^%|\n]+)% \| ([^%|\n]+)%")
});
static TX_VOLUME_RE: Lazy<Regex> = Lazy::new(|| pattern(r"🎲 5m TXs/Vol: ([^/\n]+)/\$([^K\n]+)K"));
static MCAP_K_RE: Lazy<Regex> = Lazy::new(|| pattern(r"💡 MCP: \$([^K\n]+)K"));
static MCAP_M_RE: Lazy<Regex> = Lazy::new(|| pattern(r"💡 MCP: \$([^M\n]+)M"));
static LIQUIDITY_RE: Lazy<Regex> =
    Lazy::new(|| pattern(r"💧 Liq: ([^ \n]+) SOL \(\$([^K\n]+)K 🔥([^%\n]+)%\)"));
static HOLDER_RE: Lazy<Regex> = Lazy::new(|| pattern(r"👥 Holder: ([0-9,]+)"));
static OPEN_TIME_RE: Lazy<Regex> = Lazy::new(|| pattern(r"🕒 Open: ([^ago\n]+)ago"));
static TOP10_RE: Lazy<Regex> = Lazy::new(|| pattern(r"[✅❌]TOP 10: ([^%\n]+)%"));
static DEV_STATUS_RE: Lazy<Regex> = Lazy::new(|| pattern(r"⏳ DEV: ([^$\n]+)"));
// 👨‍🍳 is a ZWJ sequence, spelled out to keep it byte-exact
static DEV_BURNT_RE: Lazy<Regex> = Lazy::new(|| {
    pattern(r"\x{1F468}\x{200D}\x{1F373} DEV Burnt烧币: ([^(\n]+)\(🔥Rate: ([^)%\n]*)%\)")
});

/// Classify and extract in one step
pub fn parse_message(text: &str) -> TokenInfo {
    extract(text, classify(text))
}

/// Run the extractor matching an existing classification
///
/// Unknown messages come back as a bare record carrying only chain and raw text.
pub fn extract(text: &str, classification: Classification) -> TokenInfo {
    let mut info = match classification.signal_type {
        SignalType::KolBuy => extract_kol_buy(text),
        SignalType::AthPrice => extract_ath_price(text),
        SignalType::Unknown => return TokenInfo::unknown(classification.chain, text),
    };
    info.chain = classification.chain;
    info.signal_type = classification.signal_type;
    info.raw_message = text.to_string();
    info
}

/// Fields of a KOL buy alert
pub fn extract_kol_buy(text: &str) -> TokenInfo {
    let mut info = TokenInfo::default();

    if !extract_name_symbol(text, &mut info) {
        if let Some(caps) = KOL_TITLE_RE.captures(text) {
            info.symbol = caps[1].trim().to_string();
        }
    }

    info.address = extract_address(text).unwrap_or_default();

    if let Some(caps) = INFLOW_RE.captures(text) {
        info.net_inflow.amount = format!("${}", &caps[1]);
        info.net_inflow.sol = format!("{} Sol", &caps[2]);
    }

    if let Some(caps) = KOL_ACTIVITY_RE.captures(text) {
        info.kol_activity.buys = caps[1].to_string();
        info.kol_activity.sells = caps[2].to_string();
    }

    extract_price_change(text, &KOL_PRICE_CHANGE_RE, &mut info);
    extract_market_fields(text, &mut info);
    info
}

/// Fields of an ATH price alert
pub fn extract_ath_price(text: &str) -> TokenInfo {
    let mut info = TokenInfo::default();

    extract_name_symbol(text, &mut info);
    info.address = extract_address(text).unwrap_or_default();

    extract_price_change(text, &ATH_PRICE_CHANGE_RE, &mut info);
    extract_market_fields(text, &mut info);
    info
}

/// First line that is a bare address (≥32 ASCII alphanumerics)
pub fn extract_address(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| line.len() >= MIN_ADDRESS_LEN && line.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_string)
}

/// `$SYMBOL(Name)`; returns whether it matched
fn extract_name_symbol(text: &str, info: &mut TokenInfo) -> bool {
    match TOKEN_RE.captures(text) {
        Some(caps) => {
            info.symbol = caps[1].trim().to_string();
            info.name = caps[2].trim().to_string();
            true
        }
        None => false,
    }
}

fn extract_price_change(text: &str, re: &Regex, info: &mut TokenInfo) {
    if let Some(caps) = re.captures(text) {
        info.price_change.m5 = format!("{}%", &caps[1]);
        info.price_change.h1 = format!("{}%", &caps[2]);
        info.price_change.h6 = format!("{}%", &caps[3]);
    }
}

/// Fields both alert formats share
fn extract_market_fields(text: &str, info: &mut TokenInfo) {
    if let Some(caps) = TX_VOLUME_RE.captures(text) {
        info.transactions = caps[1].to_string();
        info.volume = format!("${}K", &caps[2]);
    }

    if let Some(caps) = MCAP_K_RE.captures(text) {
        info.market_cap = format!("${}K", &caps[1]);
    } else if let Some(caps) = MCAP_M_RE.captures(text) {
        info.market_cap = format!("${}M", &caps[1]);
    }

    if let Some(caps) = LIQUIDITY_RE.captures(text) {
        info.liquidity.sol = format!("{} SOL", &caps[1]);
        info.liquidity.usd = format!("${}K", &caps[2]);
        info.liquidity.burn_rate = format!("{}%", &caps[3]);
    }

    if let Some(caps) = HOLDER_RE.captures(text) {
        info.holders = caps[1].to_string();
    }

    if let Some(caps) = OPEN_TIME_RE.captures(text) {
        info.open_time = caps[1].trim().to_string();
    }

    info.security.no_mint = text.contains("✅ NoMint");
    info.security.blacklist = text.contains("✅Blacklist");
    info.security.burnt = text.contains("✅Burnt");

    if let Some(caps) = TOP10_RE.captures(text) {
        info.security.top10_percent = format!("{}%", &caps[1]);
    }

    if let Some(caps) = DEV_STATUS_RE.captures(text) {
        info.developer.status = caps[1].trim().to_string();
    }

    if let Some(caps) = DEV_BURNT_RE.captures(text) {
        info.developer.burnt = caps[1].trim().to_string();
        info.developer.burn_rate = format!("{}%", &caps[2]);
    }
}
