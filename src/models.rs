//! Data models for the token risk pipeline.
//!
//! This module contains the result shapes produced by the four producers,
//! the score and report types emitted by the aggregation stage, and the
//! sanitation helpers every producer applies before a value leaves its
//! boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Maximum length of a producer `error` string.
pub const MAX_ERROR_CHARS: usize = 200;
/// Maximum length of an audit finding title.
pub const MAX_TITLE_CHARS: usize = 100;
/// Maximum length of long free-text fields (descriptions, summaries, analyses).
pub const MAX_TEXT_CHARS: usize = 500;
/// Maximum length of a single sentiment flag.
pub const MAX_FLAG_CHARS: usize = 100;
/// Maximum length of a token name or symbol.
pub const MAX_TOKEN_NAME_CHARS: usize = 100;

/// Fixed disclaimer attached to every report.
pub const DISCLAIMER: &str = "This report is generated automatically from on-chain data and AI analysis. \
It is not financial advice and may be incomplete or wrong. Always do your own research before \
interacting with any token.";

/// Truncate a string to at most `max` characters, never splitting a character.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Shape an arbitrary failure into a producer `error` string.
pub fn error_text(err: impl fmt::Display) -> String {
    truncate_chars(&err.to_string(), MAX_ERROR_CHARS)
}

/// Common view over the four producer results.
pub trait ProducerResult {
    /// The error tag, if the producer failed.
    fn error(&self) -> Option<&str>;
}

/// How a producer result reaches the scorers.
///
/// A missing result and an error-tagged result are both "unknown", but
/// they are kept apart so reporting can tell them apart.
#[derive(Debug, PartialEq)]
pub enum Signal<'a, T> {
    /// The producer ran and its data can be trusted.
    Present(&'a T),
    /// The producer was not run.
    Absent,
    /// The producer ran and failed; its numeric fields are placeholders.
    Failed(&'a str),
}

impl<'a, T: ProducerResult> Signal<'a, T> {
    /// Classify an optional producer result.
    pub fn of(result: Option<&'a T>) -> Self {
        match result {
            None => Signal::Absent,
            Some(r) => match r.error() {
                Some(reason) => Signal::Failed(reason),
                None => Signal::Present(r),
            },
        }
    }

    /// The trusted result, if any.
    pub fn present(self) -> Option<&'a T> {
        match self {
            Signal::Present(r) => Some(r),
            Signal::Absent | Signal::Failed(_) => None,
        }
    }
}

/// One historical oracle round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRound {
    pub round_id: String,
    pub price_usd: f64,
    pub timestamp: u64,
}

/// Output of the price-oracle reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceFeedResult {
    /// Oracle contract that was read.
    #[serde(default)]
    pub feed_address: String,
    /// Symbol the caller associated with the feed.
    #[serde(default)]
    pub token_symbol: String,
    pub price_usd: f64,
    /// Unix seconds of the latest round update.
    pub timestamp: u64,
    pub round_id: String,
    /// Prior rounds, most recent first.
    #[serde(default)]
    pub history: Vec<PriceRound>,
    pub volatility_7d_pct: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PriceFeedResult {
    /// A failed read with zeroed placeholders.
    pub fn failed(feed_address: &str, token_symbol: &str, reason: impl fmt::Display) -> Self {
        Self {
            feed_address: feed_address.to_string(),
            token_symbol: token_symbol.to_string(),
            price_usd: 0.0,
            timestamp: 0,
            round_id: "0".to_string(),
            history: Vec::new(),
            volatility_7d_pct: 0.0,
            error: Some(error_text(format!("Price feed read failed: {}", reason))),
        }
    }
}

impl ProducerResult for PriceFeedResult {
    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Best-effort boolean risk indicators read from the token contract.
///
/// Every flag defaults to the safe assumption when its read fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenFlags {
    #[serde(default)]
    pub has_mint_function: bool,
    #[serde(default)]
    pub owner_renounced: bool,
    #[serde(default)]
    pub is_paused: bool,
    #[serde(default)]
    pub is_proxy: bool,
}

/// Output of the chain-state analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainStateResult {
    #[serde(default)]
    pub token_address: String,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// Total supply in base units, as a decimal string.
    #[serde(default = "default_total_supply")]
    pub total_supply: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    /// Age in whole days; `-1` when the creation lookup failed.
    #[serde(default = "default_contract_age")]
    pub contract_age_days: i64,
    pub holder_count: Option<u64>,
    pub top10_concentration_pct: Option<f64>,
    #[serde(default)]
    pub flags: TokenFlags,
    #[serde(default)]
    pub bytecode_size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn default_name() -> String {
    "Unknown".to_string()
}

pub fn default_symbol() -> String {
    "???".to_string()
}

fn default_total_supply() -> String {
    "0".to_string()
}

pub fn default_decimals() -> u8 {
    18
}

fn default_contract_age() -> i64 {
    UNKNOWN_CONTRACT_AGE
}

/// Sentinel for a contract whose creation could not be looked up.
pub const UNKNOWN_CONTRACT_AGE: i64 = -1;

impl ChainStateResult {
    /// An analysis where every read fell back to its default.
    pub fn unknown(token_address: &str) -> Self {
        Self {
            token_address: token_address.to_string(),
            name: default_name(),
            symbol: default_symbol(),
            total_supply: default_total_supply(),
            decimals: default_decimals(),
            contract_age_days: UNKNOWN_CONTRACT_AGE,
            holder_count: None,
            top10_concentration_pct: None,
            flags: TokenFlags::default(),
            bytecode_size_bytes: 0,
            error: None,
        }
    }

    /// Whether the contract age is known.
    pub fn age_known(&self) -> bool {
        self.contract_age_days >= 0
    }
}

impl ProducerResult for ChainStateResult {
    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Severity level of an audit finding.
///
/// Unrecognized severities deserialize to `Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Informational note, no direct risk
    Info,
    /// Low severity - minor or theoretical issue
    Low,
    /// Medium severity - exploitable under specific conditions
    Medium,
    /// High severity - dangerous permission or likely exploit
    High,
    /// Critical severity - rug pull, honeypot or drainable funds
    Critical,
}

impl Severity {
    /// Audit component score for a worst finding of this severity.
    pub fn risk_score(&self) -> u8 {
        match self {
            Severity::Info => 5,
            Severity::Low => 20,
            Severity::Medium => 45,
            Severity::High => 75,
            Severity::Critical => 100,
        }
    }

    /// Returns an emoji representation of the severity.
    pub fn emoji(&self) -> &'static str {
        match self {
            Severity::Info => "🔵",
            Severity::Low => "🟢",
            Severity::Medium => "🟡",
            Severity::High => "🟠",
            Severity::Critical => "🔴",
        }
    }

    /// Whether findings of this severity are called out in summaries.
    pub fn is_severe(&self) -> bool {
        matches!(self, Severity::Critical | Severity::High)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl From<&str> for Severity {
    fn from(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "CRITICAL" => Severity::Critical,
            "HIGH" => Severity::High,
            "MEDIUM" => Severity::Medium,
            "LOW" => Severity::Low,
            _ => Severity::Info,
        }
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Severity::from(raw.as_str()))
    }
}

/// A single finding reported by the contract auditor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFinding {
    pub severity: Severity,
    pub title: String,
    pub description: String,
}

impl AuditFinding {
    /// Build a finding with title and description length-capped.
    pub fn sanitized(severity: Severity, title: &str, description: &str) -> Self {
        Self {
            severity,
            title: truncate_chars(title, MAX_TITLE_CHARS),
            description: truncate_chars(description, MAX_TEXT_CHARS),
        }
    }
}

/// Output of the contract auditor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditResult {
    #[serde(default)]
    pub token_address: String,
    #[serde(default)]
    pub findings: Vec<AuditFinding>,
    #[serde(default)]
    pub summary: String,
    /// Which model or service produced the findings.
    #[serde(default)]
    pub powered_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditResult {
    /// An audit that did not run.
    pub fn failed(token_address: &str, powered_by: &str, reason: impl fmt::Display) -> Self {
        Self {
            token_address: token_address.to_string(),
            findings: Vec::new(),
            summary: "Audit unavailable".to_string(),
            powered_by: powered_by.to_string(),
            error: Some(error_text(reason)),
        }
    }

    /// Findings at `HIGH` or `CRITICAL`, in reported order.
    pub fn severe_findings(&self) -> impl Iterator<Item = &AuditFinding> {
        self.findings.iter().filter(|f| f.severity.is_severe())
    }
}

impl ProducerResult for AuditResult {
    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Output of the sentiment analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    #[serde(default)]
    pub token_name: String,
    #[serde(default)]
    pub token_symbol: String,
    /// 0 (clean) to 100 (very suspicious).
    pub sentiment_score: i64,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub analysis: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Neutral sentiment used when a reply cannot be interpreted.
pub const NEUTRAL_SENTIMENT: i64 = 50;

impl SentimentResult {
    /// A sentiment analysis that did not run.
    pub fn failed(token_name: &str, token_symbol: &str, reason: impl fmt::Display) -> Self {
        Self {
            token_name: token_name.to_string(),
            token_symbol: token_symbol.to_string(),
            sentiment_score: NEUTRAL_SENTIMENT,
            flags: Vec::new(),
            analysis: "Sentiment analysis unavailable".to_string(),
            error: Some(error_text(reason)),
        }
    }
}

impl ProducerResult for SentimentResult {
    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Three-tier classification of the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Rating {
    Safe,
    Caution,
    Avoid,
}

impl Rating {
    /// Classify a final 0-100 score. Bounds are inclusive: 30 is SAFE, 66 is AVOID.
    pub fn from_total(total: u8) -> Self {
        match total {
            0..=30 => Rating::Safe,
            31..=65 => Rating::Caution,
            _ => Rating::Avoid,
        }
    }

    /// Leading icon used in summaries.
    pub fn icon(&self) -> &'static str {
        match self {
            Rating::Safe => "✅",
            Rating::Caution => "⚠️",
            Rating::Avoid => "🚫",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rating::Safe => write!(f, "SAFE"),
            Rating::Caution => write!(f, "CAUTION"),
            Rating::Avoid => write!(f, "AVOID"),
        }
    }
}

/// One weighted component of the risk score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScore {
    pub score: u8,
    pub weight: f64,
    pub contribution: f64,
}

/// Per-component breakdown, serialized in fixed key order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub audit: ComponentScore,
    pub concentration: ComponentScore,
    pub volatility: ComponentScore,
    pub sentiment: ComponentScore,
}

impl Breakdown {
    /// Components paired with their names, in breakdown order.
    pub fn entries(&self) -> [(&'static str, &ComponentScore); 4] {
        [
            ("audit", &self.audit),
            ("concentration", &self.concentration),
            ("volatility", &self.volatility),
            ("sentiment", &self.sentiment),
        ]
    }
}

/// Final aggregated score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    pub total: u8,
    pub rating: Rating,
    pub breakdown: Breakdown,
}

/// The four nullable producer results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProducerBundle {
    #[serde(default)]
    pub price_feed: Option<PriceFeedResult>,
    #[serde(default)]
    pub chain_state: Option<ChainStateResult>,
    #[serde(default)]
    pub audit: Option<AuditResult>,
    #[serde(default)]
    pub sentiment: Option<SentimentResult>,
}

/// The complete risk report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub token_address: String,
    pub generated_at: DateTime<Utc>,
    pub risk_score: RiskScore,
    pub producers: ProducerBundle,
    /// Human-readable explanation of the score.
    pub summary: String,
    pub disclaimer: String,
}
