//! Producer fan-out and report assembly.
//!
//! Price feed, contract audit and the chain-state/sentiment chain run
//! concurrently. Sentiment runs after chain state so it can fall back to the
//! on-chain name and symbol.

use crate::cli::{is_evm_address, Args, ProducerKind};
use crate::config::Config;
use crate::models::{default_name, default_symbol, ProducerBundle, RiskReport};
use crate::producers::{
    ChainStateAnalyzer, ContractAuditor, ExplorerClient, LlmClient, PriceFeedReader, RpcClient,
    SentimentAnalyzer,
};
use crate::report::build_report;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{debug, info};

/// Symbol recorded on a price read when none is known.
const UNKNOWN_FEED_SYMBOL: &str = "UNKNOWN";

/// Everything needed to assess one token.
#[derive(Debug, Clone, Default)]
pub struct AssessmentRequest {
    pub token_address: String,
    pub feed_address: Option<String>,
    pub token_name: Option<String>,
    pub token_symbol: Option<String>,
    pub description: Option<String>,
    pub contract_source: Option<String>,
    pub skip: Vec<ProducerKind>,
}

impl AssessmentRequest {
    /// Build a request from CLI arguments and the merged config.
    pub fn from_args(args: &Args, config: &Config) -> Result<Self> {
        let token_address = validate_address("token", args.token.as_deref().unwrap_or(""))?;
        let feed_address = config
            .price_feed
            .address
            .as_deref()
            .map(|feed| validate_address("feed", feed))
            .transpose()?;

        let contract_source = match args.source {
            Some(ref path) => Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read contract source: {}", path.display()))?,
            ),
            None => None,
        };

        Ok(Self {
            token_address,
            feed_address,
            token_name: args.name.clone(),
            token_symbol: args.symbol.clone(),
            description: args.description.clone(),
            contract_source,
            skip: args.skip.clone(),
        })
    }

    fn runs(&self, kind: ProducerKind) -> bool {
        !self.skip.contains(&kind)
    }
}

/// Trimmed `address`, or an error naming `label` if it is not an EVM address.
pub fn validate_address(label: &str, address: &str) -> Result<String> {
    let address = address.trim();
    if !is_evm_address(address) {
        bail!(
            "Invalid {} address '{}': expected 0x followed by 40 hex characters",
            label,
            address
        );
    }
    Ok(address.to_string())
}

/// The external clients shared by all producers.
pub struct Pipeline {
    rpc: RpcClient,
    explorer: ExplorerClient,
    llm: LlmClient,
    history_rounds: u64,
    audit_max_tokens: u32,
    sentiment_max_tokens: u32,
}

impl Pipeline {
    pub fn from_config(config: &Config) -> Result<Self> {
        let rpc = RpcClient::new(&config.rpc.url, config.rpc.timeout_seconds)
            .context("Failed to create RPC client")?;
        let explorer = ExplorerClient::new(
            &config.explorer.base_url,
            config.explorer.api_key.clone(),
            config.explorer.timeout_seconds,
        )
        .context("Failed to create explorer client")?;
        let llm = LlmClient::new(config.llm.client_config()).context("Failed to create LLM client")?;

        Ok(Self {
            rpc,
            explorer,
            llm,
            history_rounds: config.price_feed.history_rounds,
            audit_max_tokens: config.llm.audit_max_tokens,
            sentiment_max_tokens: config.llm.sentiment_max_tokens,
        })
    }

    /// Run every producer the request does not skip.
    pub async fn collect(&self, request: &AssessmentRequest, now: DateTime<Utc>) -> ProducerBundle {
        let token = request.token_address.as_str();

        let price_feed = async {
            if !request.runs(ProducerKind::Price) {
                debug!("Price feed skipped");
                return None;
            }
            let Some(ref feed) = request.feed_address else {
                info!("No price feed configured; price signal omitted");
                return None;
            };
            let symbol = request.token_symbol.as_deref().unwrap_or(UNKNOWN_FEED_SYMBOL);
            info!("Reading price feed {}", feed);
            Some(
                PriceFeedReader::new(&self.rpc)
                    .with_history_rounds(self.history_rounds)
                    .read(feed, symbol)
                    .await,
            )
        };

        let audit = async {
            if !request.runs(ProducerKind::Audit) {
                debug!("Audit skipped");
                return None;
            }
            info!("Auditing contract {}", token);
            Some(
                ContractAuditor::new(&self.llm)
                    .with_max_tokens(self.audit_max_tokens)
                    .audit(token, request.contract_source.as_deref())
                    .await,
            )
        };

        let chain_and_sentiment = async {
            let chain_state = if request.runs(ProducerKind::Chain) {
                info!("Analyzing chain state of {}", token);
                Some(
                    ChainStateAnalyzer::new(&self.rpc, &self.explorer)
                        .analyze(token, now)
                        .await,
                )
            } else {
                debug!("Chain state skipped");
                None
            };

            let sentiment = if request.runs(ProducerKind::Sentiment) {
                let name = request
                    .token_name
                    .clone()
                    .or_else(|| chain_state.as_ref().map(|c| c.name.clone()))
                    .unwrap_or_else(default_name);
                let symbol = request
                    .token_symbol
                    .clone()
                    .or_else(|| chain_state.as_ref().map(|c| c.symbol.clone()))
                    .unwrap_or_else(default_symbol);
                info!("Analyzing sentiment for {} ({})", name, symbol);
                Some(
                    SentimentAnalyzer::new(&self.llm)
                        .with_max_tokens(self.sentiment_max_tokens)
                        .analyze(&name, &symbol, request.description.as_deref())
                        .await,
                )
            } else {
                debug!("Sentiment skipped");
                None
            };

            (chain_state, sentiment)
        };

        let (price_feed, audit, (chain_state, sentiment)) =
            tokio::join!(price_feed, audit, chain_and_sentiment);

        ProducerBundle {
            price_feed,
            chain_state,
            audit,
            sentiment,
        }
    }

    /// Collect producer results and score them.
    pub async fn assess(&self, request: &AssessmentRequest, now: DateTime<Utc>) -> RiskReport {
        let producers = self.collect(request, now).await;
        build_report(&request.token_address, producers, now)
    }
}

/// Read a saved producer bundle for offline re-scoring.
pub fn load_bundle(path: &Path) -> Result<ProducerBundle> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read results file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse results file: {}", path.display()))
}
