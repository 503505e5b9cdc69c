//! Data producers.
//!
//! Each producer talks to one unreliable external source and always returns
//! a fully-formed result: failures are folded into the result's `error`
//! field instead of being propagated.

pub mod abi;
pub mod auditor;
pub mod chain_state;
pub mod explorer;
pub mod llm;
pub mod price_feed;
pub mod rpc;
pub mod sentiment;

pub use auditor::ContractAuditor;
pub use chain_state::ChainStateAnalyzer;
pub use explorer::ExplorerClient;
pub use llm::{LlmClient, LlmConfig};
pub use price_feed::PriceFeedReader;
pub use rpc::RpcClient;
pub use sentiment::SentimentAnalyzer;

use thiserror::Error;

/// Failure inside a producer's I/O layer.
#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("cannot connect to {0}")]
    Connect(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} API error {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("{0} env var not set")]
    MissingApiKey(&'static str),
}

impl ProducerError {
    /// Classify a transport error the way the caller will want to read it.
    pub fn from_transport(err: reqwest::Error, endpoint: &str, timeout_seconds: u64) -> Self {
        if err.is_timeout() {
            ProducerError::Timeout(timeout_seconds)
        } else if err.is_connect() {
            ProducerError::Connect(endpoint.to_string())
        } else {
            ProducerError::Http(err)
        }
    }
}
