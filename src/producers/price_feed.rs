//! Reader for AggregatorV3-style price oracles.

use crate::models::{PriceFeedResult, PriceRound};
use crate::producers::abi::{call_data, decode_u8, is_negative, u256_to_f64, word};
use crate::producers::rpc::RpcClient;
use crate::producers::ProducerError;
use alloy_primitives::U256;
use futures::future::try_join;
use tracing::{debug, info, warn};

const DEFAULT_HISTORY_ROUNDS: u64 = 7;

/// One decoded `latestRoundData()` / `getRoundData()` reply.
struct RoundData {
    round_id: U256,
    answer: U256,
    updated_at: u64,
}

impl RoundData {
    fn decode(data: &[u8]) -> Result<Self, ProducerError> {
        let updated_at = word(data, 3)?;
        Ok(Self {
            round_id: word(data, 0)?,
            answer: word(data, 1)?,
            updated_at: u64::try_from(updated_at)
                .map_err(|_| ProducerError::Decode("timestamp out of range".to_string()))?,
        })
    }

    fn price(&self, decimals: u8) -> f64 {
        scale_answer(self.answer, decimals)
    }
}

/// Reads the latest price and recent rounds from an oracle contract.
pub struct PriceFeedReader<'a> {
    rpc: &'a RpcClient,
    history_rounds: u64,
}

impl<'a> PriceFeedReader<'a> {
    pub fn new(rpc: &'a RpcClient) -> Self {
        Self {
            rpc,
            history_rounds: DEFAULT_HISTORY_ROUNDS,
        }
    }

    pub fn with_history_rounds(mut self, rounds: u64) -> Self {
        self.history_rounds = rounds;
        self
    }

    /// Read `feed_address`; failures come back as an error-tagged result.
    pub async fn read(&self, feed_address: &str, token_symbol: &str) -> PriceFeedResult {
        let feed_address = feed_address.trim();
        match self.read_feed(feed_address, token_symbol).await {
            Ok(result) => {
                info!(
                    "Price feed {}: ${:.4} ({} history rounds)",
                    token_symbol,
                    result.price_usd,
                    result.history.len()
                );
                result
            }
            Err(e) => {
                warn!("Price feed read failed: {}", e);
                PriceFeedResult::failed(feed_address, token_symbol, e)
            }
        }
    }

    async fn read_feed(
        &self,
        feed_address: &str,
        token_symbol: &str,
    ) -> Result<PriceFeedResult, ProducerError> {
        let decimals_call = call_data("decimals()", &[]);
        let latest_call = call_data("latestRoundData()", &[]);
        let (decimals, latest) = try_join(
            self.rpc.eth_call(feed_address, &decimals_call),
            self.rpc.eth_call(feed_address, &latest_call),
        )
        .await?;

        let decimals = decode_u8(&decimals, 0)?;
        let latest = RoundData::decode(&latest)?;
        let price_usd = latest.price(decimals);
        let history = self.history(feed_address, latest.round_id, decimals).await;

        let prices: Vec<f64> = std::iter::once(price_usd)
            .chain(history.iter().map(|r| r.price_usd))
            .collect();

        Ok(PriceFeedResult {
            feed_address: feed_address.to_string(),
            token_symbol: token_symbol.to_string(),
            price_usd,
            timestamp: latest.updated_at,
            round_id: latest.round_id.to_string(),
            history,
            volatility_7d_pct: compute_volatility_pct(&prices),
            error: None,
        })
    }

    /// Prior rounds, most recent first. Stops at the first unreadable round.
    async fn history(&self, feed_address: &str, latest: U256, decimals: u8) -> Vec<PriceRound> {
        let mut rounds = Vec::new();
        for back in 1..=self.history_rounds {
            let target = match latest.checked_sub(U256::from(back)) {
                Some(target) if !target.is_zero() => target,
                _ => break,
            };

            let data = call_data("getRoundData(uint80)", &[target]);
            let round = match self.rpc.eth_call(feed_address, &data).await {
                Ok(reply) => RoundData::decode(&reply),
                Err(e) => Err(e),
            };

            match round {
                Ok(round) => rounds.push(PriceRound {
                    round_id: round.round_id.to_string(),
                    price_usd: round.price(decimals),
                    timestamp: round.updated_at,
                }),
                Err(e) => {
                    debug!("Round {} unavailable: {}", target, e);
                    break;
                }
            }
        }
        rounds
    }
}

/// Oracle answer as a USD price. Negative answers read as zero.
pub fn scale_answer(answer: U256, decimals: u8) -> f64 {
    if is_negative(answer) {
        return 0.0;
    }
    u256_to_f64(answer) / 10f64.powi(i32::from(decimals))
}

/// `(max - min) / min * 100` over `prices`, rounded to two decimals.
///
/// Zero when the lowest price is not positive or there are no prices.
pub fn compute_volatility_pct(prices: &[f64]) -> f64 {
    let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || min <= 0.0 {
        return 0.0;
    }
    ((max - min) / min * 100.0 * 100.0).round() / 100.0
}
