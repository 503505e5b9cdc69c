//! LLM-driven smart contract auditor.

use crate::models::{truncate_chars, AuditFinding, AuditResult, Severity, MAX_TEXT_CHARS};
use crate::producers::llm::{extract_json, ChatMessage, LlmClient};
use serde_json::Value;
use tracing::{info, warn};

/// Contract source beyond this many characters is not sent.
const MAX_SOURCE_CHARS: usize = 8000;
const AUDIT_MAX_TOKENS: u32 = 1024;
/// Summary taken from an unparseable reply.
const FALLBACK_SUMMARY_CHARS: usize = 200;

/// Audits a token contract through the LLM client.
pub struct ContractAuditor<'a> {
    llm: &'a LlmClient,
    max_tokens: u32,
}

impl<'a> ContractAuditor<'a> {
    pub fn new(llm: &'a LlmClient) -> Self {
        Self {
            llm,
            max_tokens: AUDIT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Audit `token_address`, optionally with its source or ABI.
    pub async fn audit(&self, token_address: &str, contract_source: Option<&str>) -> AuditResult {
        let user_content = match contract_source {
            Some(source) => format!(
                "Token address: {}\n\nContract source/ABI:\n{}",
                token_address,
                truncate_chars(source, MAX_SOURCE_CHARS)
            ),
            None => format!(
                "Token address: {}\n\nNo source code provided. Analyze based on the address and \
                 any known patterns for this type of contract. Focus on common DeFi risks.",
                token_address
            ),
        };

        let messages = [
            ChatMessage::system(AUDIT_SYSTEM_PROMPT),
            ChatMessage::user(user_content),
        ];

        match self.llm.complete(&messages, self.max_tokens).await {
            Ok(reply) => {
                let result = parse_audit_reply(token_address, &reply, self.llm.model());
                info!("Audit returned {} findings", result.findings.len());
                result
            }
            Err(e) => {
                warn!("Contract audit failed: {}", e);
                AuditResult::failed(token_address, self.llm.model(), e)
            }
        }
    }
}

/// Text of a loosely-typed JSON field.
fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Turn a raw model reply into a sanitized audit result.
pub fn parse_audit_reply(token_address: &str, reply: &str, powered_by: &str) -> AuditResult {
    let parsed: Value = match serde_json::from_str(extract_json(reply)) {
        Ok(value) => value,
        Err(_) => {
            warn!("Audit reply was not JSON; wrapping it as a single finding");
            return AuditResult {
                token_address: token_address.to_string(),
                findings: vec![AuditFinding::sanitized(
                    Severity::Info,
                    "Analysis completed",
                    reply,
                )],
                summary: truncate_chars(reply, FALLBACK_SUMMARY_CHARS),
                powered_by: powered_by.to_string(),
                error: None,
            };
        }
    };

    let findings = parsed
        .get("findings")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    let severity = item
                        .get("severity")
                        .and_then(Value::as_str)
                        .map_or(Severity::Info, Severity::from);
                    AuditFinding::sanitized(
                        severity,
                        &value_text(item.get("title")),
                        &value_text(item.get("description")),
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    AuditResult {
        token_address: token_address.to_string(),
        findings,
        summary: truncate_chars(&value_text(parsed.get("summary")), MAX_TEXT_CHARS),
        powered_by: powered_by.to_string(),
        error: None,
    }
}

const AUDIT_SYSTEM_PROMPT: &str = r#"You are a senior smart contract security auditor specializing in EVM DeFi contracts.

Given a token contract address and optionally its ABI or source, analyze for:
1. Rug pull mechanisms (hidden owner functions, drainable liquidity, emergency withdraw)
2. Honeypot patterns (sell restrictions, blacklist functions, transfer fees >10%)
3. Dangerous permissions (mint without cap, pause all transfers, setFee, blacklist/whitelist)
4. Centralization risks (single owner, upgradeable proxy without timelock)
5. Common vulnerabilities (reentrancy, integer overflow, unchecked returns)

RESPOND ONLY with valid JSON in this exact format, no extra text:
{
  "findings": [
    {
      "severity": "CRITICAL|HIGH|MEDIUM|LOW|INFO",
      "title": "Short title",
      "description": "What it means and why it matters"
    }
  ],
  "summary": "2-3 sentence overall assessment"
}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MAX_ERROR_CHARS, MAX_TITLE_CHARS};
    use crate::producers::llm::LlmConfig;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "0x1111111111111111111111111111111111111111";

    #[test]
    fn test_parse_valid_reply() {
        let reply = r#"{
            "findings": [
                {"severity": "HIGH", "title": "Owner can pause", "description": "Transfers can be halted."},
                {"severity": "bogus", "title": "Odd", "description": "Unknown severity."}
            ],
            "summary": "Centralized token."
        }"#;
        let result = parse_audit_reply(TOKEN, reply, "llama");

        assert_eq!(result.findings.len(), 2);
        assert_eq!(result.findings[0].severity, Severity::High);
        assert_eq!(result.findings[1].severity, Severity::Info);
        assert_eq!(result.summary, "Centralized token.");
        assert_eq!(result.powered_by, "llama");
        assert!(result.error.is_none());
    }

    #[test]
    fn test_parse_fenced_reply() {
        let reply = "```json\n{\"findings\": [], \"summary\": \"Clean.\"}\n```";
        let result = parse_audit_reply(TOKEN, reply, "llama");
        assert!(result.findings.is_empty());
        assert_eq!(result.summary, "Clean.");
    }

    #[test]
    fn test_parse_non_json_reply() {
        let reply = "I could not find anything alarming. ".repeat(30);
        let result = parse_audit_reply(TOKEN, &reply, "llama");

        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].severity, Severity::Info);
        assert_eq!(result.findings[0].title, "Analysis completed");
        assert_eq!(result.findings[0].description.chars().count(), MAX_TEXT_CHARS);
        assert_eq!(result.summary.chars().count(), FALLBACK_SUMMARY_CHARS);
    }

    #[test]
    fn test_parse_caps_field_lengths() {
        let long = "a".repeat(1000);
        let reply = json!({
            "findings": [{ "severity": "LOW", "title": long, "description": long }],
            "summary": long
        })
        .to_string();
        let result = parse_audit_reply(TOKEN, &reply, "llama");

        assert_eq!(result.findings[0].title.chars().count(), MAX_TITLE_CHARS);
        assert_eq!(result.findings[0].description.chars().count(), MAX_TEXT_CHARS);
        assert_eq!(result.summary.chars().count(), MAX_TEXT_CHARS);
    }

    #[test]
    fn test_parse_missing_fields() {
        let result = parse_audit_reply(TOKEN, r#"{"findings": [{"title": 42}]}"#, "llama");
        assert_eq!(result.findings[0].severity, Severity::Info);
        assert_eq!(result.findings[0].title, "42");
        assert_eq!(result.findings[0].description, "");
        assert_eq!(result.summary, "");
    }

    #[tokio::test]
    async fn test_audit_failure_is_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("x".repeat(1000)))
            .mount(&server)
            .await;

        let llm = LlmClient::new(LlmConfig {
            base_url: server.uri(),
            api_key: Some("key".to_string()),
            ..LlmConfig::default()
        })
        .unwrap();
        let result = ContractAuditor::new(&llm).audit(TOKEN, None).await;

        assert!(result.findings.is_empty());
        assert_eq!(result.summary, "Audit unavailable");
        let error = result.error.unwrap();
        assert!(error.starts_with("LLM API error 500"));
        assert!(error.chars().count() <= MAX_ERROR_CHARS);
    }

    #[tokio::test]
    async fn test_audit_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("function setBlacklist"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content":
                    "{\"findings\":[{\"severity\":\"CRITICAL\",\"title\":\"Drain\",\"description\":\"d\"}],\"summary\":\"Bad.\"}"
                } }]
            })))
            .mount(&server)
            .await;

        let llm = LlmClient::new(LlmConfig {
            base_url: server.uri(),
            api_key: Some("key".to_string()),
            ..LlmConfig::default()
        })
        .unwrap();
        let source = include_str!("../../fixtures/blacklist_token.sol");
        let result = ContractAuditor::new(&llm).audit(TOKEN, Some(source)).await;

        assert_eq!(result.findings[0].severity, Severity::Critical);
        assert_eq!(result.powered_by, "llama-3.3-70b-versatile");
    }
}
