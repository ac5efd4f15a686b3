// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gateway signature verification.
//!
//! The device signs the canonical unsigned encoding of its transaction.
//! Verification happens before any chain read that costs the maker, and
//! before the maker key is unsealed.

use std::time::Duration;

use ed25519_dalek::Signature;
use serde::{Deserialize, Serialize};

use crate::blockchain::LedgerTransaction;
use crate::helium::{HeliumAddress, HeliumTxn};

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("transaction carries no gateway signature")]
    MissingSignature,

    #[error("invalid gateway key: {0}")]
    InvalidKey(String),

    #[error("gateway signature does not match")]
    BadSignature,

    #[error("remote verifier rejected the transaction: {0}")]
    Remote(String),
}

/// Check the device signature and return the gateway it authenticates.
pub fn verify_gateway_signature(txn: &HeliumTxn) -> Result<HeliumAddress, VerifyError> {
    let gateway = txn.gateway().map_err(|e| VerifyError::InvalidKey(e.to_string()))?;
    let key = gateway
        .verifying_key()
        .map_err(|e| VerifyError::InvalidKey(e.to_string()))?;
    let raw = txn.gateway_signature().ok_or(VerifyError::MissingSignature)?;
    let signature = Signature::from_slice(raw).map_err(|_| VerifyError::BadSignature)?;

    key.verify_strict(&txn.signing_bytes(), &signature)
        .map_err(|_| VerifyError::BadSignature)?;
    Ok(gateway)
}

#[derive(Serialize)]
struct VerifyRequest {
    transaction: String,
    msg: String,
    signature: String,
}

#[derive(Deserialize)]
struct VerifyResponse {
    transaction: String,
}

/// Remote ECC verifier that adds the verifier signature to a mint
/// transaction once it has checked the device signature itself.
#[derive(Clone)]
pub struct EccVerifierClient {
    endpoint: String,
    client: reqwest::Client,
}

impl EccVerifierClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, VerifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VerifyError::Remote(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub async fn cosign(
        &self,
        tx: &LedgerTransaction,
        txn: &HeliumTxn,
    ) -> Result<LedgerTransaction, VerifyError> {
        let signature = txn.gateway_signature().ok_or(VerifyError::MissingSignature)?;
        let body = VerifyRequest {
            transaction: hex::encode(tx.serialize()),
            msg: hex::encode(txn.signing_bytes()),
            signature: hex::encode(signature),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| VerifyError::Remote(e.to_string()))?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "ECC verifier rejected transaction");
            return Err(VerifyError::Remote(format!("HTTP {}", response.status())));
        }

        let verified: VerifyResponse = response
            .json()
            .await
            .map_err(|e| VerifyError::Remote(e.to_string()))?;
        let bytes = hex::decode(&verified.transaction).map_err(|e| VerifyError::Remote(e.to_string()))?;
        LedgerTransaction::deserialize(&bytes).map_err(|e| VerifyError::Remote(e.to_string()))
    }
}
