//! On-chain token analyzer.
//!
//! Combines ERC-20 view calls over JSON-RPC with contract-creation and
//! holder data from the block explorer. Every read is independent and
//! falls back to a safe default when it fails.

use crate::models::{
    default_decimals, default_name, default_symbol, truncate_chars, ChainStateResult, TokenFlags,
    MAX_TOKEN_NAME_CHARS, UNKNOWN_CONTRACT_AGE,
};
use crate::producers::abi::{call_data, decode_address, decode_bool, decode_string, decode_u8, word};
use crate::producers::explorer::{ExplorerClient, TokenHolder};
use crate::producers::rpc::RpcClient;
use crate::producers::ProducerError;
use alloy_primitives::{hex, U256};
use chrono::{DateTime, Utc};
use futures::future::{join, join5};
use tracing::{debug, info, warn};

/// `mint(address,uint256)`
const MINT_SELECTOR_HEX: &str = "40c10f19";
/// `implementation()`
const PROXY_SELECTOR_HEX: &str = "5c60da1b";

const DEFAULT_HOLDER_PAGE_SIZE: usize = 100;
const TOP_HOLDERS: usize = 10;
const SECONDS_PER_DAY: i64 = 86_400;

/// Reads token metadata and risk flags from chain and explorer.
pub struct ChainStateAnalyzer<'a> {
    rpc: &'a RpcClient,
    explorer: &'a ExplorerClient,
    holder_page_size: usize,
}

impl<'a> ChainStateAnalyzer<'a> {
    pub fn new(rpc: &'a RpcClient, explorer: &'a ExplorerClient) -> Self {
        Self {
            rpc,
            explorer,
            holder_page_size: DEFAULT_HOLDER_PAGE_SIZE,
        }
    }

    /// Analyze `token_address` with ages measured against `now`.
    pub async fn analyze(&self, token_address: &str, now: DateTime<Utc>) -> ChainStateResult {
        let token = token_address.trim();

        let (name, symbol, decimals, total_supply, code) = join5(
            self.call(token, "name()"),
            self.call(token, "symbol()"),
            self.call(token, "decimals()"),
            self.call(token, "totalSupply()"),
            self.rpc.get_code(token),
        )
        .await;

        let name = name
            .and_then(|d| decode_string(&d))
            .map(|s| truncate_chars(&s, MAX_TOKEN_NAME_CHARS))
            .unwrap_or_else(|e| fallback("name", e, default_name()));
        let symbol = symbol
            .and_then(|d| decode_string(&d))
            .map(|s| truncate_chars(&s, MAX_TOKEN_NAME_CHARS))
            .unwrap_or_else(|e| fallback("symbol", e, default_symbol()));
        let decimals = decimals
            .and_then(|d| decode_u8(&d, 0))
            .unwrap_or_else(|e| fallback("decimals", e, default_decimals()));
        let total_supply = total_supply
            .and_then(|d| word(&d, 0))
            .map(|supply| supply.to_string())
            .unwrap_or_else(|e| fallback("totalSupply", e, "0".to_string()));
        let bytecode = code.unwrap_or_else(|e| fallback("bytecode", e, Vec::new()));

        let (owner, paused) = join(self.call(token, "owner()"), self.call(token, "paused()")).await;
        let owner_renounced = owner
            .and_then(|d| decode_address(&d, 0))
            .map(|owner| owner.is_zero())
            .unwrap_or(false);
        let is_paused = paused.and_then(|d| decode_bool(&d, 0)).unwrap_or(false);

        let flags = detect_flags(&bytecode, owner_renounced, is_paused);

        let (contract_age_days, holders) = join(
            self.contract_age_days(token, now),
            self.holder_stats(token),
        )
        .await;
        let (holder_count, top10_concentration_pct) = holders.unzip();

        info!(
            "Chain state for {} ({}): age {} days, {} bytecode bytes",
            name,
            symbol,
            contract_age_days,
            bytecode.len()
        );

        ChainStateResult {
            token_address: token.to_string(),
            name,
            symbol,
            total_supply,
            decimals,
            contract_age_days,
            holder_count,
            top10_concentration_pct,
            flags,
            bytecode_size_bytes: bytecode.len() as u64,
            error: None,
        }
    }

    async fn call(&self, token: &str, signature: &str) -> Result<Vec<u8>, ProducerError> {
        self.rpc.eth_call(token, &call_data(signature, &[])).await
    }

    /// Whole days since deployment, or `-1` when any lookup fails.
    async fn contract_age_days(&self, token: &str, now: DateTime<Utc>) -> i64 {
        match self.creation_timestamp(token).await {
            Ok(Some(created_at)) => age_in_days(created_at, now),
            Ok(None) => {
                debug!("No creation record for {}", token);
                UNKNOWN_CONTRACT_AGE
            }
            Err(e) => {
                warn!("Contract age lookup failed: {}", e);
                UNKNOWN_CONTRACT_AGE
            }
        }
    }

    async fn creation_timestamp(&self, token: &str) -> Result<Option<u64>, ProducerError> {
        let Some(tx_hash) = self.explorer.contract_creation_tx(token).await? else {
            return Ok(None);
        };
        let Some(block) = self.rpc.transaction_block(&tx_hash).await? else {
            return Ok(None);
        };
        self.rpc.block_timestamp(block).await
    }

    /// Holder count and top-10 share, if the explorer can provide both.
    async fn holder_stats(&self, token: &str) -> Option<(u64, f64)> {
        let holders = match self.explorer.token_holders(token, self.holder_page_size).await {
            Ok(holders) => holders,
            Err(e) => {
                warn!("Holder lookup failed: {}", e);
                return None;
            }
        };

        match concentration_from_holders(&holders) {
            Ok(Some(pct)) => Some((holders.len() as u64, pct)),
            Ok(None) => None,
            Err(e) => {
                warn!("Holder data unusable: {}", e);
                None
            }
        }
    }
}

fn fallback<T>(field: &str, err: ProducerError, default: T) -> T {
    debug!("Read of {} failed: {}", field, err);
    default
}

/// Risk flags derivable from the bytecode and the owner/paused reads.
///
/// Selector matching is a plain substring search over the hex bytecode.
pub fn detect_flags(bytecode: &[u8], owner_renounced: bool, is_paused: bool) -> TokenFlags {
    let code = hex::encode(bytecode);
    TokenFlags {
        has_mint_function: code.contains(MINT_SELECTOR_HEX),
        owner_renounced,
        is_paused,
        is_proxy: code.contains(PROXY_SELECTOR_HEX),
    }
}

/// Share of the ten largest balances in the listed total, rounded to a whole
/// percent. `None` for an empty list or a zero total.
pub fn concentration_from_holders(holders: &[TokenHolder]) -> Result<Option<f64>, ProducerError> {
    if holders.is_empty() {
        return Ok(None);
    }

    let mut balances = holders
        .iter()
        .map(|h| {
            U256::from_str_radix(h.quantity.trim(), 10).map_err(|e| {
                ProducerError::Decode(format!("bad holder quantity {:?}: {}", h.quantity, e))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    balances.sort_unstable_by(|a, b| b.cmp(a));

    let total = balances
        .iter()
        .try_fold(U256::ZERO, |sum, b| sum.checked_add(*b));
    let top = balances
        .iter()
        .take(TOP_HOLDERS)
        .try_fold(U256::ZERO, |sum, b| sum.checked_add(*b));
    let (Some(total), Some(top)) = (total, top) else {
        return Err(ProducerError::Decode("holder balances overflow".to_string()));
    };
    if total.is_zero() {
        return Ok(None);
    }

    let basis_points = top
        .checked_mul(U256::from(10_000u64))
        .ok_or_else(|| ProducerError::Decode("holder balances overflow".to_string()))?
        / total;
    let percent = (basis_points + U256::from(50u64)) / U256::from(100u64);
    Ok(Some(u64::try_from(percent).unwrap_or(100) as f64))
}

/// Whole days between `created_at` (unix seconds) and `now`.
pub fn age_in_days(created_at: u64, now: DateTime<Utc>) -> i64 {
    match i64::try_from(created_at) {
        Ok(created_at) => (now.timestamp() - created_at).max(0) / SECONDS_PER_DAY,
        Err(_) => UNKNOWN_CONTRACT_AGE,
    }
}
