//! Component scorers.
//!
//! Each scorer maps one producer result to a 0-100 risk sub-score. They are
//! total: absent and failed producers map to a fixed default instead of an
//! error.

use crate::models::{
    AuditFinding, AuditResult, ChainStateResult, PriceFeedResult, SentimentResult, Signal,
};

/// Score used for a component whose producer gave no usable data.
pub const UNKNOWN_SCORE: u8 = 50;

/// Top-10 holder concentration bands, evaluated top-down.
const CONCENTRATION_BANDS: [(f64, u8); 4] = [(90.0, 100), (75.0, 80), (60.0, 60), (40.0, 35)];
const CONCENTRATION_FLOOR: u8 = 10;

/// 7-day volatility bands, evaluated top-down.
const VOLATILITY_BANDS: [(f64, u8); 4] = [(80.0, 100), (50.0, 75), (25.0, 50), (10.0, 25)];
const VOLATILITY_FLOOR: u8 = 5;

/// First band whose threshold `value` reaches, else `floor`.
fn band(value: f64, bands: &[(f64, u8)], floor: u8) -> u8 {
    bands
        .iter()
        .find(|(threshold, _)| value >= *threshold)
        .map_or(floor, |(_, score)| *score)
}

/// The most severe finding. Ties keep the first one reported.
pub fn worst_finding(findings: &[AuditFinding]) -> Option<&AuditFinding> {
    findings.iter().fold(None, |worst, finding| match worst {
        Some(current) if finding.severity <= current.severity => Some(current),
        _ => Some(finding),
    })
}

/// Audit score: severity of the worst finding; 0 when the audit found
/// nothing, did not run, or failed.
pub fn audit_score(audit: Option<&AuditResult>) -> u8 {
    match Signal::of(audit) {
        Signal::Present(result) => {
            worst_finding(&result.findings).map_or(0, |f| f.severity.risk_score())
        }
        Signal::Absent | Signal::Failed(_) => 0,
    }
}

/// Holder concentration score.
pub fn concentration_score(chain_state: Option<&ChainStateResult>) -> u8 {
    let pct = Signal::of(chain_state)
        .present()
        .and_then(|state| state.top10_concentration_pct);

    match pct {
        Some(pct) if pct.is_finite() => band(pct, &CONCENTRATION_BANDS, CONCENTRATION_FLOOR),
        _ => UNKNOWN_SCORE,
    }
}

/// Price volatility score.
pub fn volatility_score(price: Option<&PriceFeedResult>) -> u8 {
    match Signal::of(price) {
        Signal::Present(feed) if feed.volatility_7d_pct.is_finite() => {
            band(feed.volatility_7d_pct, &VOLATILITY_BANDS, VOLATILITY_FLOOR)
        }
        _ => UNKNOWN_SCORE,
    }
}

/// Sentiment score, clamped even though producers already clamp it.
pub fn sentiment_score(sentiment: Option<&SentimentResult>) -> u8 {
    match Signal::of(sentiment) {
        Signal::Present(result) => result.sentiment_score.clamp(0, 100) as u8,
        Signal::Absent | Signal::Failed(_) => UNKNOWN_SCORE,
    }
}
