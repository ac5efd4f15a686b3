// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain RPC client.
//!
//! [`ChainRpc`] is the seam between the onboarding flow and the network: the
//! flow only ever reads accounts, asks for a blockhash, and submits its own
//! resize batches. [`HttpChainClient`] speaks JSON-RPC over `reqwest`,
//! including the compressed-asset (`getAsset`/`getAssetProof`) methods.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;

use super::accounts::{AccountInfo, AssetProof};
use super::transaction::LedgerTransaction;
use super::types::{Hash, LedgerError, Pubkey};

const CONFIRM_POLL_INTERVAL: Duration = Duration::from_millis(500);
const CONFIRM_ATTEMPTS: u32 = 60;

/// Errors from the chain RPC boundary.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("RPC call `{method}` timed out")]
    Timeout { method: &'static str },

    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("RPC response to `{0}` had no result")]
    MissingResult(&'static str),

    #[error("RPC response could not be decoded: {0}")]
    Decode(String),

    #[error("{0} not found on chain")]
    NotFound(String),

    #[error("transaction {signature} failed: {reason}")]
    TransactionFailed { signature: String, reason: String },

    #[error("transaction {0} was not confirmed in time")]
    Unconfirmed(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl RpcError {
    /// Whether the caller may retry the whole request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RpcError::Timeout { .. } | RpcError::Unconfirmed(_))
    }
}

#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Account contents, or `None` when the address holds nothing.
    async fn get_account(&self, key: &Pubkey) -> Result<Option<AccountInfo>, RpcError>;

    async fn minimum_balance_for_rent_exemption(&self, space: u64) -> Result<u64, RpcError>;

    async fn latest_blockhash(&self) -> Result<Hash, RpcError>;

    /// Recent per-slot priority fees paid for writes to `accounts`.
    async fn recent_prioritization_fees(&self, accounts: &[Pubkey]) -> Result<Vec<u64>, RpcError>;

    /// Submit a fully signed transaction and wait for confirmation.
    async fn send_and_confirm(&self, tx: &LedgerTransaction) -> Result<String, RpcError>;

    /// Leaf data and inclusion proof of a compressed asset.
    async fn asset_proof(&self, asset: &Pubkey) -> Result<AssetProof, RpcError>;
}

// =============================================================================
// JSON-RPC wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: T,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct RpcAccount {
    lamports: u64,
    owner: String,
    data: (String, String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcBlockhash {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcPrioritizationFee {
    prioritization_fee: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcSignatureStatus {
    confirmation_status: Option<String>,
    err: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct DasAsset {
    ownership: DasOwnership,
    compression: DasCompression,
}

#[derive(Debug, Deserialize)]
struct DasOwnership {
    owner: String,
}

#[derive(Debug, Deserialize)]
struct DasCompression {
    data_hash: String,
    creator_hash: String,
    leaf_id: u32,
    tree: String,
}

#[derive(Debug, Deserialize)]
struct DasProof {
    root: String,
    proof: Vec<String>,
}

// =============================================================================
// HttpChainClient
// =============================================================================

/// JSON-RPC chain client.
pub struct HttpChainClient {
    http: reqwest::Client,
    rpc_url: String,
    asset_url: String,
    request_id: AtomicU64,
}

impl HttpChainClient {
    /// `asset_url` serves the compressed-asset methods; it is usually the
    /// same endpoint as `rpc_url`.
    pub fn new(rpc_url: impl Into<String>, asset_url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            rpc_url: rpc_url.into(),
            asset_url: asset_url.into(),
            request_id: AtomicU64::new(1),
        })
    }

    async fn call<P: Serialize + Send + Sync, R: DeserializeOwned>(
        &self,
        url: &str,
        method: &'static str,
        params: P,
    ) -> Result<Option<R>, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(method, e))?;

        let body: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| transport_error(method, e))?;

        if let Some(error) = body.error {
            tracing::debug!(method, code = error.code, message = %error.message, "RPC call returned an error");
            return Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(body.result)
    }

    async fn call_required<P: Serialize + Send + Sync, R: DeserializeOwned>(
        &self,
        method: &'static str,
        params: P,
    ) -> Result<R, RpcError> {
        self.call(&self.rpc_url, method, params)
            .await?
            .ok_or(RpcError::MissingResult(method))
    }

    async fn das<R: DeserializeOwned>(&self, method: &'static str, asset: &Pubkey) -> Result<R, RpcError> {
        let result = self
            .call(&self.asset_url, method, json!({ "id": asset.to_string() }))
            .await
            .map_err(|e| match e {
                RpcError::Rpc { message, .. } if message.contains("not found") || message.contains("No asset") => {
                    RpcError::NotFound(format!("asset {asset}"))
                }
                other => other,
            })?;
        result.ok_or_else(|| RpcError::NotFound(format!("asset {asset}")))
    }
}

fn transport_error(method: &'static str, e: reqwest::Error) -> RpcError {
    if e.is_timeout() {
        RpcError::Timeout { method }
    } else if e.is_decode() {
        RpcError::Decode(e.to_string())
    } else {
        RpcError::Transport(e.to_string())
    }
}

fn parse_key(raw: &str) -> Result<Pubkey, RpcError> {
    raw.parse::<Pubkey>().map_err(RpcError::from)
}

#[async_trait]
impl ChainRpc for HttpChainClient {
    async fn get_account(&self, key: &Pubkey) -> Result<Option<AccountInfo>, RpcError> {
        let result: WithContext<Option<RpcAccount>> = self
            .call_required(
                "getAccountInfo",
                json!([key.to_string(), { "encoding": "base64", "commitment": "confirmed" }]),
            )
            .await?;

        let Some(account) = result.value else {
            return Ok(None);
        };
        let data = Base64::decode_vec(&account.data.0)
            .map_err(|_| RpcError::Decode(format!("account {key} data is not base64")))?;
        Ok(Some(AccountInfo {
            lamports: account.lamports,
            owner: parse_key(&account.owner)?,
            data,
        }))
    }

    async fn minimum_balance_for_rent_exemption(&self, space: u64) -> Result<u64, RpcError> {
        self.call_required("getMinimumBalanceForRentExemption", json!([space]))
            .await
    }

    async fn latest_blockhash(&self) -> Result<Hash, RpcError> {
        let result: WithContext<RpcBlockhash> = self
            .call_required("getLatestBlockhash", json!([{ "commitment": "finalized" }]))
            .await?;
        Ok(result.value.blockhash.parse()?)
    }

    async fn recent_prioritization_fees(&self, accounts: &[Pubkey]) -> Result<Vec<u64>, RpcError> {
        let keys: Vec<String> = accounts.iter().map(Pubkey::to_string).collect();
        let fees: Vec<RpcPrioritizationFee> = self
            .call_required("getRecentPrioritizationFees", json!([keys]))
            .await?;
        Ok(fees.into_iter().map(|f| f.prioritization_fee).collect())
    }

    async fn send_and_confirm(&self, tx: &LedgerTransaction) -> Result<String, RpcError> {
        let encoded = Base64::encode_string(&tx.serialize());
        let signature: String = self
            .call_required(
                "sendTransaction",
                json!([encoded, { "encoding": "base64", "preflightCommitment": "confirmed" }]),
            )
            .await?;
        tracing::info!(signature = %signature, "Submitted transaction");

        for _ in 0..CONFIRM_ATTEMPTS {
            let statuses: WithContext<Vec<Option<RpcSignatureStatus>>> = self
                .call_required("getSignatureStatuses", json!([[signature.clone()]]))
                .await?;

            if let Some(Some(status)) = statuses.value.into_iter().next() {
                if let Some(err) = status.err {
                    return Err(RpcError::TransactionFailed {
                        signature,
                        reason: err.to_string(),
                    });
                }
                if matches!(status.confirmation_status.as_deref(), Some("confirmed" | "finalized")) {
                    return Ok(signature);
                }
            }
            tokio::time::sleep(CONFIRM_POLL_INTERVAL).await;
        }
        Err(RpcError::Unconfirmed(signature))
    }

    async fn asset_proof(&self, asset: &Pubkey) -> Result<AssetProof, RpcError> {
        let details: DasAsset = self.das("getAsset", asset).await?;
        let proof: DasProof = self.das("getAssetProof", asset).await?;

        Ok(AssetProof {
            asset: *asset,
            owner: parse_key(&details.ownership.owner)?,
            tree: parse_key(&details.compression.tree)?,
            leaf_index: details.compression.leaf_id,
            root: parse_key(&proof.root)?,
            data_hash: parse_key(details.compression.data_hash.trim())?,
            creator_hash: parse_key(details.compression.creator_hash.trim())?,
            proof: proof
                .proof
                .iter()
                .map(|node| parse_key(node))
                .collect::<Result<_, _>>()?,
        })
    }
}
