// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. Field names are camelCase on
//! the wire. Required string fields are modelled as `Option` so that a
//! missing field is reported as `missing_param` by the onboarding flow
//! rather than as a deserialization failure.
//!
//! ## Model Categories
//!
//! - **Transactions**: legacy pay, mint and sub-network requests
//! - **Makers**: provisioning and nonce limit administration
//! - **Hotspots**: pagination for registry listings

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::blockchain::instructions::DeploymentInfo;
use crate::onboarding::{IotDetails, MobileDetails, OnboardError};
use crate::signing::SignedArtifact;
use crate::storage::repository::hotspots::DEFAULT_PAGE_SIZE;

// =============================================================================
// Location
// =============================================================================

/// Location cell index, as a JSON number or a string.
///
/// Strings are read as decimal first and then as hexadecimal (with or
/// without a `0x` prefix), the form cell indexes are usually printed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum LocationInput {
    Index(u64),
    Text(String),
}

impl LocationInput {
    pub fn to_index(&self) -> Result<u64, OnboardError> {
        match self {
            LocationInput::Index(index) => Ok(*index),
            LocationInput::Text(text) => {
                let text = text.trim();
                if let Ok(index) = text.parse::<u64>() {
                    return Ok(index);
                }
                let hex = text
                    .strip_prefix("0x")
                    .or_else(|| text.strip_prefix("0X"))
                    .unwrap_or(text);
                u64::from_str_radix(hex, 16)
                    .map_err(|_| OnboardError::InvalidInput(format!("location {text:?} is not a cell index")))
            }
        }
    }
}

fn location_index(location: &Option<LocationInput>) -> Result<Option<u64>, OnboardError> {
    location.as_ref().map(LocationInput::to_index).transpose()
}

// =============================================================================
// Transaction Models
// =============================================================================

/// Device-built transaction submitted for co-signing.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PayRequest {
    /// Base64 envelope of the legacy transaction.
    pub transaction: Option<String>,
}

/// Result of a pay request; exactly one field is present.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PayResponse {
    /// Co-signed legacy transaction, when signing in the legacy domain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    /// Serialized new-ledger transactions, when signing in the new domain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solana_transactions: Option<Vec<Vec<u8>>>,
}

impl From<SignedArtifact> for PayResponse {
    fn from(artifact: SignedArtifact) -> Self {
        match artifact {
            SignedArtifact::Legacy(transaction) => Self {
                transaction: Some(transaction),
                solana_transactions: None,
            },
            SignedArtifact::Ledger(transactions) => Self {
                transaction: None,
                solana_transactions: Some(transactions),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateHotspotRequest {
    /// Base64 envelope of a device-signed AddGateway.
    pub transaction: Option<String>,
    /// Overrides the maker as payer of the issuance.
    pub payer: Option<String>,
}

/// Serialized new-ledger transactions, each a byte array.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SolanaTransactionsResponse {
    pub solana_transactions: Vec<Vec<u8>>,
}

impl From<Vec<Vec<u8>>> for SolanaTransactionsResponse {
    fn from(solana_transactions: Vec<Vec<u8>>) -> Self {
        Self { solana_transactions }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IotOnboardRequest {
    /// Gateway address the entity was issued for.
    pub entity_key: Option<String>,
    pub location: Option<LocationInput>,
    pub elevation: Option<i32>,
    pub gain: Option<i32>,
    pub payer: Option<String>,
}

impl IotOnboardRequest {
    pub fn details(&self) -> Result<IotDetails, OnboardError> {
        Ok(IotDetails {
            location: location_index(&self.location)?,
            elevation: self.elevation,
            gain: self.gain,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MobileOnboardRequest {
    pub entity_key: Option<String>,
    pub location: Option<LocationInput>,
    pub deployment_info: Option<DeploymentInfo>,
    pub payer: Option<String>,
}

impl MobileOnboardRequest {
    pub fn details(&self) -> Result<MobileDetails, OnboardError> {
        Ok(MobileDetails {
            location: location_index(&self.location)?,
            deployment_info: self.deployment_info.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IotUpdateRequest {
    pub entity_key: Option<String>,
    /// Owner wallet; pays when neither an explicit payer nor the maker does.
    pub wallet: Option<String>,
    pub location: Option<LocationInput>,
    pub elevation: Option<i32>,
    pub gain: Option<i32>,
    pub payer: Option<String>,
}

impl IotUpdateRequest {
    pub fn details(&self) -> Result<IotDetails, OnboardError> {
        Ok(IotDetails {
            location: location_index(&self.location)?,
            elevation: self.elevation,
            gain: self.gain,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MobileUpdateRequest {
    pub entity_key: Option<String>,
    pub wallet: Option<String>,
    pub location: Option<LocationInput>,
    pub deployment_info: Option<DeploymentInfo>,
    pub payer: Option<String>,
}

impl MobileUpdateRequest {
    pub fn details(&self) -> Result<MobileDetails, OnboardError> {
        Ok(MobileDetails {
            location: location_index(&self.location)?,
            deployment_info: self.deployment_info.clone(),
        })
    }
}

// =============================================================================
// Maker Models
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMakerRequest {
    pub name: Option<String>,
    /// Location assertions the maker pays for per hotspot.
    #[serde(default)]
    pub location_nonce_limit: u32,
    /// Existing entropy (hex) to import instead of generating a new key.
    pub entropy: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNonceLimitRequest {
    pub location_nonce_limit: u32,
}

// =============================================================================
// Hotspot Models
// =============================================================================

/// Pagination of registry listings.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Zero-based page number.
    pub page: Option<usize>,
    /// Records per page, at most 100.
    pub page_size: Option<usize>,
}

impl PageParams {
    pub fn page(&self) -> usize {
        self.page.unwrap_or(0)
    }

    pub fn page_size(&self) -> usize {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_accepts_numbers_and_strings() {
        let parse = |raw: &str| serde_json::from_str::<LocationInput>(raw).unwrap().to_index();
        assert_eq!(parse("631210968840687103").unwrap(), 631210968840687103);
        assert_eq!(parse(r#""631210968840687103""#).unwrap(), 631210968840687103);
        assert_eq!(parse(r#""8c2ab38f1ee1dff""#).unwrap(), 0x8c2ab38f1ee1dff);
        assert_eq!(parse(r#""0x10""#).unwrap(), 16);
        assert!(matches!(parse(r#""nowhere""#), Err(OnboardError::InvalidInput(_))));
    }

    #[test]
    fn pay_response_carries_one_artifact() {
        let legacy = serde_json::to_value(PayResponse::from(SignedArtifact::Legacy("abc".into()))).unwrap();
        assert_eq!(legacy, serde_json::json!({ "transaction": "abc" }));

        let ledger = serde_json::to_value(PayResponse::from(SignedArtifact::Ledger(vec![vec![1, 2]]))).unwrap();
        assert_eq!(ledger, serde_json::json!({ "solanaTransactions": [[1, 2]] }));
    }

    #[test]
    fn mobile_request_reads_deployment_info() {
        let request: MobileOnboardRequest = serde_json::from_str(
            r#"{"entityKey":"k","location":"0x1","deploymentInfo":{"cbrsInfoV0":{"radioInfos":[{"radioId":"r","elevation":3}]}}}"#,
        )
        .unwrap();
        let details = request.details().unwrap();
        assert_eq!(details.location, Some(1));
        assert!(matches!(details.deployment_info, Some(DeploymentInfo::CbrsInfoV0 { .. })));
    }

    #[test]
    fn page_defaults() {
        let params = PageParams::default();
        assert_eq!(params.page(), 0);
        assert_eq!(params.page_size(), DEFAULT_PAGE_SIZE);
    }
}
