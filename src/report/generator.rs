//! Report assembly and rendering.
//!
//! This module builds the `RiskReport` envelope from collected producer
//! results and renders it as JSON, Markdown or plain text.

use crate::analysis::{applied_penalties, compute_risk_score};
use crate::models::{
    AuditResult, ChainStateResult, PriceFeedResult, ProducerBundle, RiskReport, SentimentResult,
    Signal, DISCLAIMER,
};
use crate::report::summary::generate_summary;
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Score a bundle of producer results and wrap it in a report.
pub fn build_report(
    token_address: &str,
    producers: ProducerBundle,
    generated_at: DateTime<Utc>,
) -> RiskReport {
    let risk_score = compute_risk_score(
        producers.price_feed.as_ref(),
        producers.chain_state.as_ref(),
        producers.audit.as_ref(),
        producers.sentiment.as_ref(),
    );

    let summary = generate_summary(
        token_address,
        &risk_score,
        producers.price_feed.as_ref(),
        producers.chain_state.as_ref(),
        producers.audit.as_ref(),
        producers.sentiment.as_ref(),
    );

    RiskReport {
        token_address: token_address.to_string(),
        generated_at,
        risk_score,
        producers,
        summary,
        disclaimer: DISCLAIMER.to_string(),
    }
}

/// Generate a JSON report.
pub fn generate_json_report(report: &RiskReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Generate the plain-text report: summary and disclaimer.
pub fn generate_text_report(report: &RiskReport) -> String {
    format!("{}\n\n{}\n", report.summary, report.disclaimer)
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &RiskReport) -> String {
    let mut output = String::new();

    output.push_str("# Token Risk Report\n\n");
    output.push_str(&format!("- **Token:** `{}`\n", report.token_address));
    output.push_str(&format!(
        "- **Generated:** {}\n\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(&format!("> {}\n\n", report.summary));

    output.push_str(&generate_score_section(report));
    output.push_str(&generate_price_section(report.producers.price_feed.as_ref()));
    output.push_str(&generate_chain_section(report.producers.chain_state.as_ref()));
    output.push_str(&generate_audit_section(report.producers.audit.as_ref()));
    output.push_str(&generate_sentiment_section(report.producers.sentiment.as_ref()));

    output.push_str("---\n\n");
    output.push_str(&format!("*{}*\n", report.disclaimer));

    output
}

fn generate_score_section(report: &RiskReport) -> String {
    let score = &report.risk_score;
    let mut section = String::new();

    section.push_str("## Risk Score\n\n");
    section.push_str(&format!(
        "**{} {}/100 - {}**\n\n",
        score.rating.icon(),
        score.total,
        score.rating
    ));

    section.push_str("| Component | Score | Weight | Contribution |\n");
    section.push_str("|:---|:---:|:---:|:---:|\n");
    for (name, component) in score.breakdown.entries() {
        section.push_str(&format!(
            "| {} | {} | {:.0}% | {:.2} |\n",
            name,
            component.score,
            component.weight * 100.0,
            component.contribution
        ));
    }
    section.push('\n');

    let penalties = applied_penalties(report.producers.chain_state.as_ref());
    if !penalties.is_empty() {
        section.push_str("### Flag Penalties\n\n");
        for penalty in penalties {
            section.push_str(&format!("- +{} {}\n", penalty.points, penalty.label));
        }
        section.push('\n');
    }

    section
}

fn generate_price_section(price: Option<&PriceFeedResult>) -> String {
    let mut section = String::from("## Price Feed\n\n");
    let feed = match Signal::of(price) {
        Signal::Present(feed) => feed,
        Signal::Absent => {
            section.push_str("*Not run.*\n\n");
            return section;
        }
        Signal::Failed(reason) => {
            section.push_str(&format!("*Unavailable:* {}\n\n", reason));
            return section;
        }
    };

    section.push_str(&format!("- **Feed:** `{}`\n", feed.feed_address));
    section.push_str(&format!("- **Price:** ${:.4}\n", feed.price_usd));
    section.push_str(&format!("- **Round:** {}\n", feed.round_id));
    section.push_str(&format!(
        "- **7d Volatility:** {:.2}% over {} rounds\n\n",
        feed.volatility_7d_pct,
        feed.history.len() + 1
    ));

    section
}

fn generate_chain_section(chain_state: Option<&ChainStateResult>) -> String {
    let mut section = String::from("## On-Chain State\n\n");
    let state = match Signal::of(chain_state) {
        Signal::Present(state) => state,
        Signal::Absent => {
            section.push_str("*Not run.*\n\n");
            return section;
        }
        Signal::Failed(reason) => {
            section.push_str(&format!("*Unavailable:* {}\n\n", reason));
            return section;
        }
    };

    let age = if state.age_known() {
        format!("{} days", state.contract_age_days)
    } else {
        "unknown".to_string()
    };
    let holders = state
        .holder_count
        .map_or("unknown".to_string(), |n| n.to_string());
    let concentration = state
        .top10_concentration_pct
        .map_or("unknown".to_string(), |p| format!("{:.0}%", p));

    section.push_str(&format!("- **Name:** {} ({})\n", state.name, state.symbol));
    section.push_str(&format!(
        "- **Total Supply:** {} (decimals: {})\n",
        state.total_supply, state.decimals
    ));
    section.push_str(&format!("- **Contract Age:** {}\n", age));
    section.push_str(&format!("- **Holders:** {}\n", holders));
    section.push_str(&format!("- **Top-10 Concentration:** {}\n", concentration));
    section.push_str(&format!(
        "- **Bytecode Size:** {} bytes\n\n",
        state.bytecode_size_bytes
    ));

    section.push_str("| Mint | Owner Renounced | Paused | Proxy |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} |\n\n",
        yes_no(state.flags.has_mint_function),
        yes_no(state.flags.owner_renounced),
        yes_no(state.flags.is_paused),
        yes_no(state.flags.is_proxy)
    ));

    section
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn generate_audit_section(audit: Option<&AuditResult>) -> String {
    let mut section = String::from("## Contract Audit\n\n");
    let result = match Signal::of(audit) {
        Signal::Present(result) => result,
        Signal::Absent => {
            section.push_str("*Not run.*\n\n");
            return section;
        }
        Signal::Failed(reason) => {
            section.push_str(&format!("*Unavailable:* {}\n\n", reason));
            return section;
        }
    };

    if !result.summary.is_empty() {
        section.push_str(&format!("{}\n\n", result.summary));
    }

    if result.findings.is_empty() {
        section.push_str("No issues were surfaced by the audit.\n\n");
    } else {
        // Most severe first, reported order within a severity.
        let mut findings: Vec<_> = result.findings.iter().collect();
        findings.sort_by(|a, b| b.severity.cmp(&a.severity));

        for finding in findings {
            section.push_str(&format!(
                "### {} **{}** - {}\n\n",
                finding.severity.emoji(),
                finding.severity,
                finding.title
            ));
            if !finding.description.is_empty() {
                section.push_str(&format!("{}\n\n", finding.description));
            }
        }
    }

    if !result.powered_by.is_empty() {
        section.push_str(&format!("*Audit by `{}`*\n\n", result.powered_by));
    }

    section
}

fn generate_sentiment_section(sentiment: Option<&SentimentResult>) -> String {
    let mut section = String::from("## Sentiment\n\n");
    let result = match Signal::of(sentiment) {
        Signal::Present(result) => result,
        Signal::Absent => {
            section.push_str("*Not run.*\n\n");
            return section;
        }
        Signal::Failed(reason) => {
            section.push_str(&format!("*Unavailable:* {}\n\n", reason));
            return section;
        }
    };

    section.push_str(&format!(
        "- **Score:** {}/100\n- **Analysis:** {}\n",
        result.sentiment_score, result.analysis
    ));
    if !result.flags.is_empty() {
        section.push_str(&format!("- **Flags:** {}\n", result.flags.join(", ")));
    }
    section.push('\n');

    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuditFinding, Rating, Severity, TokenFlags};
    use chrono::TimeZone;

    const TOKEN: &str = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd";

    fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn full_bundle() -> ProducerBundle {
        ProducerBundle {
            price_feed: Some(PriceFeedResult {
                feed_address: "0x5498BB86BC934c8D34FDA08E81D444153d0D06aD".to_string(),
                token_symbol: "AVAX".to_string(),
                price_usd: 24.1234,
                timestamp: 1_700_000_000,
                round_id: "110680464442257320247".to_string(),
                history: vec![],
                volatility_7d_pct: 8.2,
                error: None,
            }),
            chain_state: Some(ChainStateResult {
                name: "Moon Token".to_string(),
                symbol: "MOON".to_string(),
                contract_age_days: 2,
                holder_count: Some(40),
                top10_concentration_pct: Some(91.0),
                flags: TokenFlags {
                    has_mint_function: true,
                    ..TokenFlags::default()
                },
                bytecode_size_bytes: 4096,
                ..ChainStateResult::unknown(TOKEN)
            }),
            audit: Some(AuditResult {
                token_address: TOKEN.to_string(),
                findings: vec![
                    AuditFinding::sanitized(Severity::Low, "Missing events", ""),
                    AuditFinding::sanitized(
                        Severity::Critical,
                        "Owner can mint unlimited supply",
                        "The owner may inflate supply at will.",
                    ),
                ],
                summary: "High centralization risk.".to_string(),
                powered_by: "llama-3.3-70b-versatile".to_string(),
                error: None,
            }),
            sentiment: None,
        }
    }

    #[test]
    fn test_build_report_envelope() {
        let report = build_report(TOKEN, full_bundle(), generated_at());

        // 100*.35 + 100*.25 + 5*.25 + 50*.15 = 68.75, +10 age, +5 mint
        assert_eq!(report.risk_score.total, 84);
        assert_eq!(report.risk_score.rating, Rating::Avoid);
        assert_eq!(report.token_address, TOKEN);
        assert_eq!(report.disclaimer, DISCLAIMER);
        assert!(report.summary.contains("Owner can mint unlimited supply"));
        assert!(report.producers.sentiment.is_none());
    }

    #[test]
    fn test_generate_json_report() {
        let report = build_report(TOKEN, ProducerBundle::default(), generated_at());
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"generated_at\": \"2026-03-01T12:00:00Z\""));
        assert!(json.contains("\"rating\": \"CAUTION\""));
        assert!(json.contains("\"price_feed\": null"));

        let parsed: RiskReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = build_report(TOKEN, full_bundle(), generated_at());
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# Token Risk Report"));
        assert!(markdown.contains("## Risk Score"));
        assert!(markdown.contains("| audit | 100 | 35% | 35.00 |"));
        assert!(markdown.contains("- +10 contract younger than 7 days"));
        assert!(markdown.contains("- +5 mint function present"));
        assert!(!markdown.contains("upgradeable proxy"));
        assert!(markdown.contains("Moon Token (MOON)"));
        assert!(markdown.contains("## Sentiment\n\n*Not run.*"));
        assert!(markdown.ends_with(&format!("*{}*\n", DISCLAIMER)));
    }

    #[test]
    fn test_markdown_lists_findings_by_severity() {
        let report = build_report(TOKEN, full_bundle(), generated_at());
        let markdown = generate_markdown_report(&report);

        let critical = markdown.find("Owner can mint unlimited supply").unwrap();
        let low = markdown.find("Missing events").unwrap();
        assert!(critical < low);
    }

    #[test]
    fn test_markdown_reports_failed_producer() {
        let bundle = ProducerBundle {
            audit: Some(AuditResult::failed(TOKEN, "llama", "LLM API error 429")),
            ..ProducerBundle::default()
        };
        let report = build_report(TOKEN, bundle, generated_at());
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("*Unavailable:* LLM API error 429"));
    }

    #[test]
    fn test_generate_text_report() {
        let report = build_report(TOKEN, ProducerBundle::default(), generated_at());
        let text = generate_text_report(&report);

        assert!(text.starts_with(&report.summary));
        assert!(text.trim_end().ends_with(DISCLAIMER));
    }
}
