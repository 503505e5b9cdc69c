//! Ethereum JSON-RPC client.
//!
//! A thin wrapper over `reqwest` exposing only the calls the producers use.

use crate::producers::ProducerError;
use alloy_primitives::hex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// JSON-RPC client for an EVM node.
pub struct RpcClient {
    url: String,
    timeout_seconds: u64,
    http_client: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Create a client for the node at `url`.
    pub fn new(url: &str, timeout_seconds: u64) -> Result<Self, ProducerError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            url: url.to_string(),
            timeout_seconds,
            http_client,
            next_id: AtomicU64::new(1),
        })
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ProducerError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        debug!("RPC {} #{}", method, request.id);

        let response = self
            .http_client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProducerError::from_transport(e, &self.url, self.timeout_seconds))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProducerError::Api {
                service: "RPC",
                status,
                body: crate::models::error_text(body),
            });
        }

        let rpc_response: RpcResponse = response.json().await?;

        if let Some(error) = rpc_response.error {
            return Err(ProducerError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        Ok(rpc_response.result.unwrap_or(Value::Null))
    }

    /// `eth_call` against the latest block.
    pub async fn eth_call(&self, to: &str, data: &[u8]) -> Result<Vec<u8>, ProducerError> {
        let params = json!([{ "to": to, "data": hex::encode_prefixed(data) }, "latest"]);
        let result = self.request("eth_call", params).await?;
        decode_hex_value(&result)
    }

    /// Deployed bytecode at `address`; empty for externally-owned accounts.
    pub async fn get_code(&self, address: &str) -> Result<Vec<u8>, ProducerError> {
        let result = self
            .request("eth_getCode", json!([address, "latest"]))
            .await?;
        decode_hex_value(&result)
    }

    /// Block number a transaction was mined in, if known.
    pub async fn transaction_block(&self, tx_hash: &str) -> Result<Option<u64>, ProducerError> {
        let result = self
            .request("eth_getTransactionByHash", json!([tx_hash]))
            .await?;
        match result.get("blockNumber").and_then(Value::as_str) {
            Some(quantity) => parse_quantity(quantity).map(Some),
            None => Ok(None),
        }
    }

    /// Unix timestamp of a block, if it exists.
    pub async fn block_timestamp(&self, number: u64) -> Result<Option<u64>, ProducerError> {
        let result = self
            .request("eth_getBlockByNumber", json!([format!("{:#x}", number), false]))
            .await?;
        match result.get("timestamp").and_then(Value::as_str) {
            Some(quantity) => parse_quantity(quantity).map(Some),
            None => Ok(None),
        }
    }
}

/// Parse a hex-encoded JSON-RPC quantity such as `"0x1b4"`.
pub fn parse_quantity(quantity: &str) -> Result<u64, ProducerError> {
    let digits = quantity.strip_prefix("0x").unwrap_or(quantity);
    u64::from_str_radix(digits, 16)
        .map_err(|e| ProducerError::Decode(format!("bad quantity {:?}: {}", quantity, e)))
}

fn decode_hex_value(value: &Value) -> Result<Vec<u8>, ProducerError> {
    let text = value
        .as_str()
        .ok_or_else(|| ProducerError::Decode(format!("expected hex string, got {}", value)))?;
    let digits = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(digits).map_err(|e| ProducerError::Decode(format!("bad hex data: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x1b4").unwrap(), 436);
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert!(parse_quantity("0xzz").is_err());
    }

    #[tokio::test]
    async fn test_eth_call_decodes_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_call" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": "0x0000000000000000000000000000000000000000000000000000000000000012"
            })))
            .mount(&server)
            .await;

        let client = RpcClient::new(&server.uri(), 5).unwrap();
        let data = client.eth_call("0xfeed", &[0x31, 0x3c, 0xe5, 0x67]).await.unwrap();
        assert_eq!(data.len(), 32);
        assert_eq!(data[31], 18);
    }

    #[tokio::test]
    async fn test_rpc_error_object_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32000, "message": "execution reverted" }
            })))
            .mount(&server)
            .await;

        let client = RpcClient::new(&server.uri(), 5).unwrap();
        let err = client.get_code("0xabc").await.unwrap_err();
        assert!(matches!(err, ProducerError::Rpc { code: -32000, .. }));
        assert_eq!(err.to_string(), "RPC error -32000: execution reverted");
    }

    #[tokio::test]
    async fn test_block_lookups() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_getTransactionByHash" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": { "blockNumber": "0x10" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "eth_getBlockByNumber" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 2, "result": { "timestamp": "0x65000000" }
            })))
            .mount(&server)
            .await;

        let client = RpcClient::new(&server.uri(), 5).unwrap();
        assert_eq!(client.transaction_block("0xhash").await.unwrap(), Some(16));
        assert_eq!(client.block_timestamp(16).await.unwrap(), Some(0x6500_0000));
    }
}
