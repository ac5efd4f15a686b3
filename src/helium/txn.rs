// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Legacy ledger transactions.
//!
//! Devices submit a base64-encoded `blockchain_txn` envelope. The envelope is
//! a protobuf `oneof`; its field tag is the variant discriminator. Anything
//! other than the three variants below is rejected before any key is touched.
//!
//! The bytes a signature covers are the inner message encoded with every
//! signature field cleared.

use base64ct::{Base64, Encoding};
use ed25519_dalek::{Signature, Signer, SigningKey};
use prost::Message;

use super::HeliumAddress;

/// Errors raised while parsing or re-encoding legacy transactions.
#[derive(Debug, thiserror::Error)]
pub enum TxnError {
    #[error("transaction is not valid base64")]
    InvalidEncoding,

    #[error("transaction could not be decoded: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("Unsupported transaction type")]
    UnsupportedType,

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid location `{0}`")]
    InvalidLocation(String),
}

/// Envelope carried on the wire.
#[derive(Clone, PartialEq, Message)]
pub struct BlockchainTxn {
    #[prost(oneof = "blockchain_txn::Txn", tags = "1, 2, 28")]
    pub txn: Option<blockchain_txn::Txn>,
}

pub mod blockchain_txn {
    use prost::Oneof;

    #[derive(Clone, PartialEq, Oneof)]
    pub enum Txn {
        #[prost(message, tag = "1")]
        AddGateway(super::AddGatewayV1),
        #[prost(message, tag = "2")]
        AssertLocation(super::AssertLocationV1),
        #[prost(message, tag = "28")]
        AssertLocationV2(super::AssertLocationV2),
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct AddGatewayV1 {
    #[prost(bytes = "vec", tag = "1")]
    pub owner: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub gateway: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub owner_signature: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub gateway_signature: Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    pub payer: Vec<u8>,
    #[prost(bytes = "vec", tag = "6")]
    pub payer_signature: Vec<u8>,
    #[prost(uint64, tag = "7")]
    pub staking_fee: u64,
    #[prost(uint64, tag = "8")]
    pub fee: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct AssertLocationV1 {
    #[prost(bytes = "vec", tag = "1")]
    pub gateway: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub owner: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub payer: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub gateway_signature: Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    pub owner_signature: Vec<u8>,
    #[prost(bytes = "vec", tag = "6")]
    pub payer_signature: Vec<u8>,
    #[prost(string, tag = "7")]
    pub location: String,
    #[prost(uint64, tag = "8")]
    pub nonce: u64,
    #[prost(uint64, tag = "9")]
    pub staking_fee: u64,
    #[prost(uint64, tag = "10")]
    pub fee: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct AssertLocationV2 {
    #[prost(bytes = "vec", tag = "1")]
    pub gateway: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub owner: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub payer: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub owner_signature: Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    pub payer_signature: Vec<u8>,
    #[prost(string, tag = "6")]
    pub location: String,
    #[prost(uint64, tag = "7")]
    pub nonce: u64,
    #[prost(int32, tag = "8")]
    pub gain: i32,
    #[prost(int32, tag = "9")]
    pub elevation: i32,
    #[prost(uint64, tag = "10")]
    pub staking_fee: u64,
    #[prost(uint64, tag = "11")]
    pub fee: u64,
}

/// Variant discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnKind {
    AddGateway,
    AssertLocationV1,
    AssertLocationV2,
}

impl TxnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxnKind::AddGateway => "add_gateway_v1",
            TxnKind::AssertLocationV1 => "assert_location_v1",
            TxnKind::AssertLocationV2 => "assert_location_v2",
        }
    }
}

/// A classified device transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum HeliumTxn {
    AddGateway(AddGatewayV1),
    AssertLocationV1(AssertLocationV1),
    AssertLocationV2(AssertLocationV2),
}

impl HeliumTxn {
    /// Decode a base64 wire string and identify its variant.
    pub fn classify(wire: &str) -> Result<Self, TxnError> {
        let bytes = Base64::decode_vec(wire.trim()).map_err(|_| TxnError::InvalidEncoding)?;
        let envelope = BlockchainTxn::decode(bytes.as_slice())?;

        let txn = match envelope.txn.ok_or(TxnError::UnsupportedType)? {
            blockchain_txn::Txn::AddGateway(inner) => HeliumTxn::AddGateway(inner),
            blockchain_txn::Txn::AssertLocation(inner) => HeliumTxn::AssertLocationV1(inner),
            blockchain_txn::Txn::AssertLocationV2(inner) => HeliumTxn::AssertLocationV2(inner),
        };
        Ok(txn)
    }

    pub fn kind(&self) -> TxnKind {
        match self {
            HeliumTxn::AddGateway(_) => TxnKind::AddGateway,
            HeliumTxn::AssertLocationV1(_) => TxnKind::AssertLocationV1,
            HeliumTxn::AssertLocationV2(_) => TxnKind::AssertLocationV2,
        }
    }

    /// Declared fee payer, if any.
    pub fn payer(&self) -> Result<Option<HeliumAddress>, TxnError> {
        let raw = match self {
            HeliumTxn::AddGateway(t) => &t.payer,
            HeliumTxn::AssertLocationV1(t) => &t.payer,
            HeliumTxn::AssertLocationV2(t) => &t.payer,
        };
        optional_address(raw)
    }

    /// Gateway (device) address; this is the address the record binds to.
    pub fn gateway(&self) -> Result<HeliumAddress, TxnError> {
        let raw = match self {
            HeliumTxn::AddGateway(t) => &t.gateway,
            HeliumTxn::AssertLocationV1(t) => &t.gateway,
            HeliumTxn::AssertLocationV2(t) => &t.gateway,
        };
        optional_address(raw)?.ok_or(TxnError::MissingField("gateway"))
    }

    pub fn owner(&self) -> Result<HeliumAddress, TxnError> {
        let raw = match self {
            HeliumTxn::AddGateway(t) => &t.owner,
            HeliumTxn::AssertLocationV1(t) => &t.owner,
            HeliumTxn::AssertLocationV2(t) => &t.owner,
        };
        optional_address(raw)?.ok_or(TxnError::MissingField("owner"))
    }

    /// Location-assertion sequence number.
    pub fn nonce(&self) -> Option<u64> {
        match self {
            HeliumTxn::AddGateway(_) => None,
            HeliumTxn::AssertLocationV1(t) => Some(t.nonce),
            HeliumTxn::AssertLocationV2(t) => Some(t.nonce),
        }
    }

    /// Asserted location as an H3 index.
    pub fn location(&self) -> Result<Option<u64>, TxnError> {
        let raw = match self {
            HeliumTxn::AddGateway(_) => return Ok(None),
            HeliumTxn::AssertLocationV1(t) => &t.location,
            HeliumTxn::AssertLocationV2(t) => &t.location,
        };
        if raw.is_empty() {
            return Ok(None);
        }
        u64::from_str_radix(raw, 16)
            .map(Some)
            .map_err(|_| TxnError::InvalidLocation(raw.clone()))
    }

    pub fn elevation(&self) -> Option<i32> {
        match self {
            HeliumTxn::AssertLocationV2(t) => Some(t.elevation),
            _ => None,
        }
    }

    pub fn gain(&self) -> Option<i32> {
        match self {
            HeliumTxn::AssertLocationV2(t) => Some(t.gain),
            _ => None,
        }
    }

    /// Device signature, present on AddGateway and AssertLocationV1.
    pub fn gateway_signature(&self) -> Option<&[u8]> {
        let raw = match self {
            HeliumTxn::AddGateway(t) => &t.gateway_signature,
            HeliumTxn::AssertLocationV1(t) => &t.gateway_signature,
            HeliumTxn::AssertLocationV2(_) => return None,
        };
        (!raw.is_empty()).then_some(raw.as_slice())
    }

    /// Canonical unsigned serialization: the inner message with every
    /// signature field cleared.
    pub fn signing_bytes(&self) -> Vec<u8> {
        match self {
            HeliumTxn::AddGateway(t) => {
                let mut unsigned = t.clone();
                unsigned.owner_signature.clear();
                unsigned.gateway_signature.clear();
                unsigned.payer_signature.clear();
                unsigned.encode_to_vec()
            }
            HeliumTxn::AssertLocationV1(t) => {
                let mut unsigned = t.clone();
                unsigned.owner_signature.clear();
                unsigned.gateway_signature.clear();
                unsigned.payer_signature.clear();
                unsigned.encode_to_vec()
            }
            HeliumTxn::AssertLocationV2(t) => {
                let mut unsigned = t.clone();
                unsigned.owner_signature.clear();
                unsigned.payer_signature.clear();
                unsigned.encode_to_vec()
            }
        }
    }

    /// Apply the payer signature.
    pub fn sign_as_payer(&mut self, payer: &SigningKey) {
        let signature: Signature = payer.sign(&self.signing_bytes());
        let bytes = signature.to_bytes().to_vec();
        match self {
            HeliumTxn::AddGateway(t) => t.payer_signature = bytes,
            HeliumTxn::AssertLocationV1(t) => t.payer_signature = bytes,
            HeliumTxn::AssertLocationV2(t) => t.payer_signature = bytes,
        }
    }

    pub fn payer_signature(&self) -> Option<&[u8]> {
        let raw = match self {
            HeliumTxn::AddGateway(t) => &t.payer_signature,
            HeliumTxn::AssertLocationV1(t) => &t.payer_signature,
            HeliumTxn::AssertLocationV2(t) => &t.payer_signature,
        };
        (!raw.is_empty()).then_some(raw.as_slice())
    }

    /// Re-encode as a base64 wire string.
    pub fn to_wire(&self) -> String {
        let txn = match self.clone() {
            HeliumTxn::AddGateway(inner) => blockchain_txn::Txn::AddGateway(inner),
            HeliumTxn::AssertLocationV1(inner) => blockchain_txn::Txn::AssertLocation(inner),
            HeliumTxn::AssertLocationV2(inner) => blockchain_txn::Txn::AssertLocationV2(inner),
        };
        Base64::encode_string(&BlockchainTxn { txn: Some(txn) }.encode_to_vec())
    }
}

fn optional_address(raw: &[u8]) -> Result<Option<HeliumAddress>, TxnError> {
    if raw.is_empty() {
        Ok(None)
    } else {
        HeliumAddress::from_bin(raw).map(Some)
    }
}
