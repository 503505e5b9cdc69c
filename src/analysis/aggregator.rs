//! Risk score aggregation.
//!
//! Combines the four component scores with fixed weights, adds flag
//! penalties from the chain state, clamps and classifies:
//!
//! ```text
//! total = audit*0.35 + concentration*0.25 + volatility*0.25 + sentiment*0.15
//!       + penalties                       (clamped to [0, 100], rounded half-up)
//! ```
//!
//! The sum is carried in hundredths of a point so rounding is exact.

use crate::analysis::scorers;
use crate::models::{
    AuditResult, Breakdown, ChainStateResult, ComponentScore, PriceFeedResult, Rating, RiskScore,
    SentimentResult, Signal,
};
use tracing::debug;

/// Component weights in whole percent. They sum to 100.
const AUDIT_WEIGHT_PCT: u32 = 35;
const CONCENTRATION_WEIGHT_PCT: u32 = 25;
const VOLATILITY_WEIGHT_PCT: u32 = 25;
const SENTIMENT_WEIGHT_PCT: u32 = 15;

const MAX_TOTAL: i64 = 100;

/// Contracts younger than this many days are penalized.
pub const YOUNG_CONTRACT_DAYS: i64 = 7;

/// An additive adjustment triggered by a chain-state indicator.
pub struct FlagPenalty {
    /// Short human-readable reason.
    pub label: &'static str,
    pub points: i64,
    applies: fn(&ChainStateResult) -> bool,
}

impl FlagPenalty {
    pub fn applies_to(&self, state: &ChainStateResult) -> bool {
        (self.applies)(state)
    }
}

fn is_young_contract(state: &ChainStateResult) -> bool {
    // Negative ages mean the lookup failed and carry no penalty.
    (0..YOUNG_CONTRACT_DAYS).contains(&state.contract_age_days)
}

fn has_mint_function(state: &ChainStateResult) -> bool {
    state.flags.has_mint_function
}

fn is_proxy(state: &ChainStateResult) -> bool {
    state.flags.is_proxy
}

/// Penalties evaluated against the chain state, in order.
pub static FLAG_PENALTIES: [FlagPenalty; 3] = [
    FlagPenalty {
        label: "contract younger than 7 days",
        points: 10,
        applies: is_young_contract,
    },
    FlagPenalty {
        label: "mint function present",
        points: 5,
        applies: has_mint_function,
    },
    FlagPenalty {
        label: "upgradeable proxy",
        points: 5,
        applies: is_proxy,
    },
];

/// Penalties that apply to a chain state. Absent or failed chain state
/// triggers none.
pub fn applied_penalties(chain_state: Option<&ChainStateResult>) -> Vec<&'static FlagPenalty> {
    match Signal::of(chain_state) {
        Signal::Present(state) => FLAG_PENALTIES
            .iter()
            .filter(|penalty| penalty.applies_to(state))
            .collect(),
        Signal::Absent | Signal::Failed(_) => Vec::new(),
    }
}

fn component(score: u8, weight_pct: u32) -> ComponentScore {
    let weight = f64::from(weight_pct) / 100.0;
    ComponentScore {
        score,
        weight,
        contribution: f64::from(score) * weight,
    }
}

/// Weighted sum of a component in hundredths of a point.
fn hundredths(score: u8, weight_pct: u32) -> i64 {
    i64::from(score) * i64::from(weight_pct)
}

/// Compute the aggregated risk score. Every argument may be absent.
pub fn compute_risk_score(
    price: Option<&PriceFeedResult>,
    chain_state: Option<&ChainStateResult>,
    audit: Option<&AuditResult>,
    sentiment: Option<&SentimentResult>,
) -> RiskScore {
    let audit_score = scorers::audit_score(audit);
    let concentration_score = scorers::concentration_score(chain_state);
    let volatility_score = scorers::volatility_score(price);
    let sentiment_score = scorers::sentiment_score(sentiment);

    let breakdown = Breakdown {
        audit: component(audit_score, AUDIT_WEIGHT_PCT),
        concentration: component(concentration_score, CONCENTRATION_WEIGHT_PCT),
        volatility: component(volatility_score, VOLATILITY_WEIGHT_PCT),
        sentiment: component(sentiment_score, SENTIMENT_WEIGHT_PCT),
    };

    let weighted = hundredths(audit_score, AUDIT_WEIGHT_PCT)
        + hundredths(concentration_score, CONCENTRATION_WEIGHT_PCT)
        + hundredths(volatility_score, VOLATILITY_WEIGHT_PCT)
        + hundredths(sentiment_score, SENTIMENT_WEIGHT_PCT);

    let penalties: i64 = applied_penalties(chain_state)
        .iter()
        .map(|penalty| penalty.points)
        .sum();

    // The floor is unreachable while every penalty is positive.
    let clamped = (weighted + penalties * 100).clamp(0, MAX_TOTAL * 100);
    let total = ((clamped + 50) / 100) as u8;
    let rating = Rating::from_total(total);

    debug!(
        audit = audit_score,
        concentration = concentration_score,
        volatility = volatility_score,
        sentiment = sentiment_score,
        penalties,
        total,
        "Computed risk score ({})",
        rating
    );

    RiskScore {
        total,
        rating,
        breakdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuditFinding, Severity, TokenFlags};

    fn chain(age: i64, flags: TokenFlags, concentration: Option<f64>) -> ChainStateResult {
        ChainStateResult {
            contract_age_days: age,
            flags,
            top10_concentration_pct: concentration,
            ..ChainStateResult::unknown("0x0")
        }
    }

    fn feed(volatility: f64) -> PriceFeedResult {
        PriceFeedResult {
            feed_address: "0xfeed".to_string(),
            token_symbol: "AVAX".to_string(),
            price_usd: 25.0,
            timestamp: 1_700_000_000,
            round_id: "42".to_string(),
            history: vec![],
            volatility_7d_pct: volatility,
            error: None,
        }
    }

    fn audit(severity: Severity) -> AuditResult {
        AuditResult {
            token_address: "0x0".to_string(),
            findings: vec![AuditFinding {
                severity,
                title: "finding".to_string(),
                description: String::new(),
            }],
            summary: String::new(),
            powered_by: "test".to_string(),
            error: None,
        }
    }

    fn sentiment(score: i64) -> SentimentResult {
        SentimentResult {
            token_name: "T".to_string(),
            token_symbol: "T".to_string(),
            sentiment_score: score,
            flags: vec![],
            analysis: String::new(),
            error: None,
        }
    }

    #[test]
    fn test_all_missing_is_neutral_caution() {
        let score = compute_risk_score(None, None, None, None);

        assert_eq!(score.breakdown.audit.score, 0);
        assert_eq!(score.breakdown.concentration.score, 50);
        assert_eq!(score.breakdown.volatility.score, 50);
        assert_eq!(score.breakdown.sentiment.score, 50);
        assert_eq!(score.breakdown.audit.weight, 0.35);
        assert_eq!(score.breakdown.concentration.contribution, 12.5);
        // 32.5 rounds half-up
        assert_eq!(score.total, 33);
        assert_eq!(score.rating, Rating::Caution);
    }

    #[test]
    fn test_failed_producers_match_missing() {
        let failed_feed = PriceFeedResult::failed("0xfeed", "AVAX", "down");
        let failed_audit = AuditResult::failed("0x0", "test", "down");
        let failed_sentiment = SentimentResult::failed("T", "T", "down");

        let score = compute_risk_score(
            Some(&failed_feed),
            None,
            Some(&failed_audit),
            Some(&failed_sentiment),
        );
        assert_eq!(score, compute_risk_score(None, None, None, None));
    }

    #[test]
    fn test_penalties_stack() {
        let flags = TokenFlags {
            has_mint_function: true,
            is_proxy: true,
            ..TokenFlags::default()
        };
        let base = compute_risk_score(None, Some(&chain(30, TokenFlags::default(), None)), None, None);
        let penalized = compute_risk_score(None, Some(&chain(3, flags, None)), None, None);

        assert_eq!(base.total, 33);
        assert_eq!(penalized.total, base.total + 20);
        assert_eq!(applied_penalties(Some(&chain(3, flags, None))).len(), 3);
    }

    #[test]
    fn test_unknown_age_is_not_penalized() {
        let state = chain(-1, TokenFlags::default(), None);
        assert!(applied_penalties(Some(&state)).is_empty());

        let brand_new = chain(0, TokenFlags::default(), None);
        assert_eq!(applied_penalties(Some(&brand_new)).len(), 1);

        let week_old = chain(7, TokenFlags::default(), None);
        assert!(applied_penalties(Some(&week_old)).is_empty());
    }

    #[test]
    fn test_failed_chain_state_has_no_penalties() {
        let mut state = chain(
            1,
            TokenFlags {
                has_mint_function: true,
                owner_renounced: false,
                is_paused: false,
                is_proxy: true,
            },
            Some(95.0),
        );
        state.error = Some("unreachable".to_string());

        assert!(applied_penalties(Some(&state)).is_empty());
        assert_eq!(
            compute_risk_score(None, Some(&state), None, None),
            compute_risk_score(None, None, None, None)
        );
    }

    #[test]
    fn test_total_is_clamped_to_100() {
        let flags = TokenFlags {
            has_mint_function: true,
            is_proxy: true,
            ..TokenFlags::default()
        };
        let state = chain(2, flags, Some(99.0));
        let score = compute_risk_score(
            Some(&feed(150.0)),
            Some(&state),
            Some(&audit(Severity::Critical)),
            Some(&sentiment(100)),
        );
        assert_eq!(score.total, 100);
        assert_eq!(score.rating, Rating::Avoid);
    }

    #[test]
    fn test_rating_boundaries_through_engine() {
        // 20*.35 + 35*.25 + 50*.25 + 12*.15 = 30.05
        let safe = compute_risk_score(
            Some(&feed(30.0)),
            Some(&chain(100, TokenFlags::default(), Some(45.0))),
            Some(&audit(Severity::Low)),
            Some(&sentiment(12)),
        );
        assert_eq!(safe.total, 30);
        assert_eq!(safe.rating, Rating::Safe);

        // 20*.35 + 35*.25 + 50*.25 + 15*.15 = 30.5
        let caution = compute_risk_score(
            Some(&feed(30.0)),
            Some(&chain(100, TokenFlags::default(), Some(45.0))),
            Some(&audit(Severity::Low)),
            Some(&sentiment(15)),
        );
        assert_eq!(caution.total, 31);
        assert_eq!(caution.rating, Rating::Caution);

        // 75*.35 + 80*.25 + 75*.25 + 0*.15 = 65
        let upper_caution = compute_risk_score(
            Some(&feed(60.0)),
            Some(&chain(100, TokenFlags::default(), Some(80.0))),
            Some(&audit(Severity::High)),
            Some(&sentiment(0)),
        );
        assert_eq!(upper_caution.total, 65);
        assert_eq!(upper_caution.rating, Rating::Caution);

        // 65 + 7*.15 = 66.05
        let avoid = compute_risk_score(
            Some(&feed(60.0)),
            Some(&chain(100, TokenFlags::default(), Some(80.0))),
            Some(&audit(Severity::High)),
            Some(&sentiment(7)),
        );
        assert_eq!(avoid.total, 66);
        assert_eq!(avoid.rating, Rating::Avoid);
    }

    #[test]
    fn test_compute_is_deterministic() {
        let state = chain(3, TokenFlags::default(), Some(62.0));
        let price = feed(12.0);
        let findings = audit(Severity::Medium);
        let mood = sentiment(40);

        let first = compute_risk_score(Some(&price), Some(&state), Some(&findings), Some(&mood));
        let second = compute_risk_score(Some(&price), Some(&state), Some(&findings), Some(&mood));
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_contributions_match_scores() {
        let score = compute_risk_score(
            Some(&feed(55.0)),
            Some(&chain(100, TokenFlags::default(), Some(92.0))),
            Some(&audit(Severity::Medium)),
            Some(&sentiment(20)),
        );
        for (name, c) in score.breakdown.entries() {
            assert!(
                (c.contribution - f64::from(c.score) * c.weight).abs() < 1e-9,
                "{}",
                name
            );
        }
        // 45*.35 + 100*.25 + 75*.25 + 20*.15 = 62.5
        assert_eq!(score.total, 63);
    }
}
