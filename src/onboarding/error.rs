// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Errors returned by the onboarding flows.
//!
//! Every variant has a stable machine-readable [`code`](OnboardError::code)
//! and an HTTP [`status`](OnboardError::status). Messages never contain key
//! material; custody errors name the key version at most.

use axum::http::StatusCode;

use crate::blockchain::{LedgerError, RpcError};
use crate::custody::CustodyError;
use crate::helium::TxnError;
use crate::signing::{DomainError, VerifyError};
use crate::storage::DbError;

#[derive(Debug, thiserror::Error)]
pub enum OnboardError {
    // ----- validation (422) -----
    #[error("Missing {0} param")]
    MissingParam(&'static str),

    #[error("Unsupported transaction type")]
    UnsupportedTransactionType,

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Nonce limit exceeded")]
    NonceLimitExceeded { nonce: u64, limit: u32 },

    #[error("Invalid payer address")]
    InvalidPayer,

    #[error("Invalid hotspot address")]
    InvalidHotspotAddress,

    #[error("Payer cannot be the maker")]
    PayerCannotBeMaker,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ----- conflict (422) -----
    #[error("Onboarding key already used")]
    OnboardingKeyAlreadyUsed,

    #[error("Hotspot is immutable")]
    HotspotImmutable,

    #[error("{0} already exists")]
    Conflict(String),

    // ----- signature (400) -----
    #[error("Invalid gateway signature")]
    InvalidGatewaySigner,

    // ----- not found (404) -----
    #[error("Hotspot not found")]
    HotspotNotFound,

    #[error("Maker not found")]
    MakerNotFound,

    #[error("Maker does not exist")]
    MakerAccountMissing,

    #[error("Key to asset does not exist, has the entity been created?")]
    KeyToAssetMissing,

    #[error("Hotspot info does not exist, has it been onboarded?")]
    HotspotInfoMissing,

    #[error("No asset found: {0}")]
    AssetNotFound(String),

    #[error("{0} not found")]
    NotFound(String),

    // ----- upstream -----
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("Ledger request failed: {0}")]
    Upstream(RpcError),

    // ----- internal (500) -----
    #[error("Key custody failure: {0}")]
    Custody(#[from] CustodyError),

    #[error("Transaction build failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Storage failure: {0}")]
    Storage(DbError),
}

impl OnboardError {
    pub fn code(&self) -> &'static str {
        match self {
            OnboardError::MissingParam(_) => "missing_param",
            OnboardError::UnsupportedTransactionType => "unsupported_transaction_type",
            OnboardError::InvalidTransaction(_) => "invalid_transaction",
            OnboardError::NonceLimitExceeded { .. } => "nonce_limit_exceeded",
            OnboardError::InvalidPayer => "invalid_payer",
            OnboardError::InvalidHotspotAddress => "invalid_hotspot_address",
            OnboardError::PayerCannotBeMaker => "payer_cannot_be_maker",
            OnboardError::InvalidInput(_) => "invalid_input",
            OnboardError::OnboardingKeyAlreadyUsed => "onboarding_key_already_used",
            OnboardError::HotspotImmutable => "hotspot_immutable",
            OnboardError::Conflict(_) => "conflict",
            OnboardError::InvalidGatewaySigner => "invalid_gateway_signer",
            OnboardError::HotspotNotFound => "hotspot_not_found",
            OnboardError::MakerNotFound => "maker_not_found",
            OnboardError::MakerAccountMissing => "maker_account_missing",
            OnboardError::KeyToAssetMissing => "key_to_asset_missing",
            OnboardError::HotspotInfoMissing => "hotspot_info_missing",
            OnboardError::AssetNotFound(_) => "asset_not_found",
            OnboardError::NotFound(_) => "not_found",
            OnboardError::LedgerUnavailable(_) => "ledger_unavailable",
            OnboardError::Upstream(_) => "upstream_error",
            OnboardError::Custody(_) => "key_custody_error",
            OnboardError::Ledger(_) => "transaction_build_error",
            OnboardError::Storage(_) => "storage_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            OnboardError::MissingParam(_)
            | OnboardError::UnsupportedTransactionType
            | OnboardError::InvalidTransaction(_)
            | OnboardError::NonceLimitExceeded { .. }
            | OnboardError::InvalidPayer
            | OnboardError::InvalidHotspotAddress
            | OnboardError::PayerCannotBeMaker
            | OnboardError::InvalidInput(_)
            | OnboardError::OnboardingKeyAlreadyUsed
            | OnboardError::HotspotImmutable
            | OnboardError::Conflict(_) => StatusCode::UNPROCESSABLE_ENTITY,
            OnboardError::InvalidGatewaySigner => StatusCode::BAD_REQUEST,
            OnboardError::HotspotNotFound
            | OnboardError::MakerNotFound
            | OnboardError::MakerAccountMissing
            | OnboardError::KeyToAssetMissing
            | OnboardError::HotspotInfoMissing
            | OnboardError::AssetNotFound(_)
            | OnboardError::NotFound(_) => StatusCode::NOT_FOUND,
            OnboardError::LedgerUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            OnboardError::Upstream(_)
            | OnboardError::Custody(_)
            | OnboardError::Ledger(_)
            | OnboardError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TxnError> for OnboardError {
    fn from(e: TxnError) -> Self {
        match e {
            TxnError::UnsupportedType => OnboardError::UnsupportedTransactionType,
            other => OnboardError::InvalidTransaction(other.to_string()),
        }
    }
}

impl From<VerifyError> for OnboardError {
    fn from(e: VerifyError) -> Self {
        tracing::warn!(error = %e, "Gateway signature rejected");
        OnboardError::InvalidGatewaySigner
    }
}

impl From<DomainError> for OnboardError {
    fn from(e: DomainError) -> Self {
        OnboardError::LedgerUnavailable(e.to_string())
    }
}

impl From<RpcError> for OnboardError {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::NotFound(what) => OnboardError::AssetNotFound(what),
            e if e.is_retryable() => OnboardError::LedgerUnavailable(e.to_string()),
            RpcError::Ledger(inner) => OnboardError::Ledger(inner),
            other => OnboardError::Upstream(other),
        }
    }
}

impl From<DbError> for OnboardError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => OnboardError::NotFound(what),
            DbError::Conflict(what) => OnboardError::Conflict(what),
            DbError::Immutable(_) => OnboardError::HotspotImmutable,
            DbError::AlreadyBound { .. } | DbError::AddressTaken { .. } => {
                OnboardError::OnboardingKeyAlreadyUsed
            }
            other => OnboardError::Storage(other),
        }
    }
}
