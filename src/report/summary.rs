//! One-paragraph natural-language explanation of a risk score.

use crate::models::{
    truncate_chars, AuditResult, ChainStateResult, PriceFeedResult, RiskScore, SentimentResult,
    Signal,
};

/// Characters of the token address shown when the name is unknown.
const ADDRESS_PREFIX_CHARS: usize = 10;

/// Render the summary for a scored token.
///
/// Free-text fields are expected to be length-capped already by their
/// producers and are not truncated again.
pub fn generate_summary(
    token_address: &str,
    score: &RiskScore,
    price: Option<&PriceFeedResult>,
    chain_state: Option<&ChainStateResult>,
    audit: Option<&AuditResult>,
    sentiment: Option<&SentimentResult>,
) -> String {
    let trusted_state = Signal::of(chain_state).present();

    let (name, symbol) = match trusted_state {
        Some(state) => (state.name.clone(), state.symbol.clone()),
        None => (
            format!("{}...", truncate_chars(token_address, ADDRESS_PREFIX_CHARS)),
            "???".to_string(),
        ),
    };

    let trusted_price = Signal::of(price).present();

    let price_text = match trusted_price {
        Some(feed) if feed.price_usd > 0.0 => format!("${:.4}", feed.price_usd),
        _ => "N/A".to_string(),
    };

    let concentration_text = match trusted_state.and_then(|s| s.top10_concentration_pct) {
        Some(pct) => format!("{:.0}%", pct),
        None => "unknown".to_string(),
    };

    let volatility_text = match trusted_price {
        Some(feed) => format!("{:.1}%", feed.volatility_7d_pct),
        None => "unknown".to_string(),
    };

    let severe: Vec<&str> = audit
        .map(|a| a.severe_findings().map(|f| f.title.as_str()).collect())
        .unwrap_or_default();
    let critical_text = if severe.is_empty() {
        String::new()
    } else {
        format!(" Critical issues: {}.", severe.join(", "))
    };

    let sentiment_text = sentiment.map_or("not analyzed", |s| s.analysis.as_str());

    format!(
        "{} {} ({}) - Risk Score: {}/100 [{}]. Current price: {}. \
         Holder concentration (top-10): {}. 7d volatility: {}.{} Sentiment: {}",
        score.rating.icon(),
        name,
        symbol,
        score.total,
        score.rating,
        price_text,
        concentration_text,
        volatility_text,
        critical_text,
        sentiment_text,
    )
}
