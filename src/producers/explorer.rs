//! Block-explorer REST client (Etherscan-compatible `?module=&action=` API).

use crate::models::error_text;
use crate::producers::ProducerError;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// A token holder as listed by the explorer.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenHolder {
    #[serde(rename = "TokenHolderAddress", default)]
    pub address: String,
    /// Balance in base units, as a decimal string.
    #[serde(rename = "TokenHolderQuantity")]
    pub quantity: String,
}

#[derive(Debug, Deserialize)]
struct ContractCreation {
    #[serde(rename = "txHash")]
    tx_hash: String,
}

/// Client for the block explorer API.
pub struct ExplorerClient {
    base_url: String,
    api_key: Option<String>,
    timeout_seconds: u64,
    http_client: reqwest::Client,
}

impl ExplorerClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout_seconds: u64,
    ) -> Result<Self, ProducerError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            timeout_seconds,
            http_client,
        })
    }

    /// Issue a query and return the `result` member of the response.
    async fn get(&self, query: &[(&str, &str)]) -> Result<Value, ProducerError> {
        let url = format!("{}/api", self.base_url);
        let mut params: Vec<(&str, &str)> = query.to_vec();
        if let Some(ref key) = self.api_key {
            params.push(("apikey", key.as_str()));
        }

        debug!("Explorer query {:?}", query);

        let response = self
            .http_client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| ProducerError::from_transport(e, &self.base_url, self.timeout_seconds))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProducerError::Api {
                service: "Explorer",
                status,
                body: error_text(body),
            });
        }

        let mut body: Value = response.json().await?;
        Ok(body.get_mut("result").map(Value::take).unwrap_or(Value::Null))
    }

    /// Hash of the transaction that deployed `address`, if the explorer knows it.
    pub async fn contract_creation_tx(&self, address: &str) -> Result<Option<String>, ProducerError> {
        let result = self
            .get(&[
                ("module", "contract"),
                ("action", "getcontractcreation"),
                ("contractaddresses", address),
            ])
            .await?;

        // Rate-limit and "not found" replies carry a string result.
        let creations: Vec<ContractCreation> = match result {
            Value::Array(_) => serde_json::from_value(result)
                .map_err(|e| ProducerError::Decode(e.to_string()))?,
            _ => return Ok(None),
        };

        Ok(creations.into_iter().next().map(|c| c.tx_hash))
    }

    /// First page of token holders.
    pub async fn token_holders(
        &self,
        address: &str,
        page_size: usize,
    ) -> Result<Vec<TokenHolder>, ProducerError> {
        let offset = page_size.to_string();
        let result = self
            .get(&[
                ("module", "token"),
                ("action", "tokenholderlist"),
                ("contractaddress", address),
                ("page", "1"),
                ("offset", offset.as_str()),
            ])
            .await?;

        match result {
            Value::Array(_) => {
                serde_json::from_value(result).map_err(|e| ProducerError::Decode(e.to_string()))
            }
            other => Err(ProducerError::Decode(format!(
                "unexpected holder list: {}",
                error_text(other)
            ))),
        }
    }
}
