//! LLM-driven sentiment analysis of a token's name, symbol and description.

use crate::models::{
    truncate_chars, SentimentResult, MAX_FLAG_CHARS, MAX_TEXT_CHARS, MAX_TOKEN_NAME_CHARS,
    NEUTRAL_SENTIMENT,
};
use crate::producers::llm::{extract_json, ChatMessage, LlmClient};
use serde_json::Value;
use tracing::{info, warn};

const MAX_DESCRIPTION_CHARS: usize = 1000;
const SENTIMENT_MAX_TOKENS: u32 = 512;
const FALLBACK_ANALYSIS_CHARS: usize = 200;

/// Scores how suspicious a token's branding looks.
pub struct SentimentAnalyzer<'a> {
    llm: &'a LlmClient,
    max_tokens: u32,
}

impl<'a> SentimentAnalyzer<'a> {
    pub fn new(llm: &'a LlmClient) -> Self {
        Self {
            llm,
            max_tokens: SENTIMENT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub async fn analyze(
        &self,
        token_name: &str,
        token_symbol: &str,
        description: Option<&str>,
    ) -> SentimentResult {
        let token_name = truncate_chars(token_name, MAX_TOKEN_NAME_CHARS);
        let token_symbol = truncate_chars(token_symbol, MAX_TOKEN_NAME_CHARS);
        let (token_name, token_symbol) = (token_name.as_str(), token_symbol.as_str());
        let description = description
            .map(|d| truncate_chars(d, MAX_DESCRIPTION_CHARS))
            .unwrap_or_else(|| "Not provided".to_string());
        let user_content = format!(
            "Token name: {}\nSymbol: {}\nDescription: {}",
            token_name, token_symbol, description
        );

        let messages = [
            ChatMessage::system(SENTIMENT_SYSTEM_PROMPT),
            ChatMessage::user(user_content),
        ];

        match self.llm.complete(&messages, self.max_tokens).await {
            Ok(reply) => {
                let result = parse_sentiment_reply(token_name, token_symbol, &reply);
                info!("Sentiment score {}", result.sentiment_score);
                result
            }
            Err(e) => {
                warn!("Sentiment analysis failed: {}", e);
                SentimentResult::failed(token_name, token_symbol, e)
            }
        }
    }
}

/// Read a score that may arrive as a number or a numeric string.
fn score_value(value: Option<&Value>) -> i64 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match raw {
        Some(score) if score.is_finite() => score.round().clamp(0.0, 100.0) as i64,
        _ => NEUTRAL_SENTIMENT,
    }
}

/// Turn a raw model reply into a sanitized sentiment result.
pub fn parse_sentiment_reply(token_name: &str, token_symbol: &str, reply: &str) -> SentimentResult {
    let parsed: Value = match serde_json::from_str(extract_json(reply)) {
        Ok(value) => value,
        Err(_) => {
            warn!("Sentiment reply was not JSON; using neutral score");
            return SentimentResult {
                token_name: token_name.to_string(),
                token_symbol: token_symbol.to_string(),
                sentiment_score: NEUTRAL_SENTIMENT,
                flags: vec!["Parse error - manual review recommended".to_string()],
                analysis: truncate_chars(reply, FALLBACK_ANALYSIS_CHARS),
                error: None,
            };
        }
    };

    let flags = parsed
        .get("flags")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|flag| match flag {
                    Value::String(s) => truncate_chars(s, MAX_FLAG_CHARS),
                    other => truncate_chars(&other.to_string(), MAX_FLAG_CHARS),
                })
                .collect()
        })
        .unwrap_or_default();

    let analysis = match parsed.get("analysis") {
        Some(Value::String(s)) => truncate_chars(s, MAX_TEXT_CHARS),
        Some(Value::Null) | None => String::new(),
        Some(other) => truncate_chars(&other.to_string(), MAX_TEXT_CHARS),
    };

    SentimentResult {
        token_name: token_name.to_string(),
        token_symbol: token_symbol.to_string(),
        sentiment_score: score_value(parsed.get("sentiment_score")),
        flags,
        analysis,
        error: None,
    }
}

const SENTIMENT_SYSTEM_PROMPT: &str = r#"You are a DeFi fraud detection specialist. Analyze a token's name, symbol, and description for warning signs.

Look for:
- FOMO/hype naming ("Moon", "Safe", "Gem", "100x", "ElonBased", "Turbo")
- Impersonation of legitimate projects ("SafeMoon", "BabyETH", "MiniDOGE")
- Unrealistic promises in description ("guaranteed returns", "rugproof", "fully audited" without proof)
- Anonymous team + aggressive marketing language
- Legitimate indicators (real utility description, team transparency, verifiable use case)

RESPOND ONLY with valid JSON, no extra text:
{
  "sentiment_score": <integer 0-100, where 0=very clean, 100=very suspicious>,
  "flags": ["list", "of", "detected", "red", "flags"],
  "analysis": "2-3 sentence explanation"
}"#;
