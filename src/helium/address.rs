// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Legacy ledger addresses.
//!
//! Binary form is one key-type byte (network in the high nibble, key type in
//! the low nibble) followed by the 32-byte ed25519 public key. The text form
//! is base58 over `version(0) || binary || checksum`, where the checksum is
//! the first four bytes of a double SHA-256 over the version and binary.

use ed25519_dalek::VerifyingKey;
use sha2::{Digest, Sha256};

use super::TxnError;

const ADDRESS_VERSION: u8 = 0x00;
const KEY_TYPE_ED25519: u8 = 0x01;
const KEY_TYPE_MASK: u8 = 0x0F;
const PUBLIC_KEY_LEN: usize = 32;
const BIN_LEN: usize = PUBLIC_KEY_LEN + 1;
const CHECKSUM_LEN: usize = 4;

/// An ed25519 legacy-ledger address.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeliumAddress {
    bin: [u8; BIN_LEN],
}

impl HeliumAddress {
    /// Mainnet ed25519 address for a public key.
    pub fn from_public_key(key: &VerifyingKey) -> Self {
        let mut bin = [0u8; BIN_LEN];
        bin[0] = KEY_TYPE_ED25519;
        bin[1..].copy_from_slice(key.as_bytes());
        Self { bin }
    }

    /// Parse the binary form carried inside transactions.
    pub fn from_bin(bytes: &[u8]) -> Result<Self, TxnError> {
        if bytes.len() != BIN_LEN {
            return Err(TxnError::InvalidAddress(format!(
                "expected {BIN_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        if bytes[0] & KEY_TYPE_MASK != KEY_TYPE_ED25519 {
            return Err(TxnError::InvalidAddress(format!(
                "unsupported key type {:#04x}",
                bytes[0]
            )));
        }
        let mut bin = [0u8; BIN_LEN];
        bin.copy_from_slice(bytes);
        Ok(Self { bin })
    }

    /// Parse the base58check text form.
    pub fn from_b58(encoded: &str) -> Result<Self, TxnError> {
        let raw = bs58::decode(encoded.trim())
            .into_vec()
            .map_err(|e| TxnError::InvalidAddress(format!("invalid base58: {e}")))?;

        if raw.len() != 1 + BIN_LEN + CHECKSUM_LEN || raw[0] != ADDRESS_VERSION {
            return Err(TxnError::InvalidAddress(format!(
                "unexpected address length {}",
                raw.len()
            )));
        }

        let (payload, checksum) = raw.split_at(1 + BIN_LEN);
        if checksum != &double_sha256(payload)[..CHECKSUM_LEN] {
            return Err(TxnError::InvalidAddress("checksum mismatch".to_string()));
        }

        Self::from_bin(&payload[1..])
    }

    /// Base58check text form.
    pub fn to_b58(&self) -> String {
        let mut payload = Vec::with_capacity(1 + BIN_LEN + CHECKSUM_LEN);
        payload.push(ADDRESS_VERSION);
        payload.extend_from_slice(&self.bin);
        let checksum = double_sha256(&payload);
        payload.extend_from_slice(&checksum[..CHECKSUM_LEN]);
        bs58::encode(payload).into_string()
    }

    /// Binary form (key type byte + public key).
    pub fn as_bin(&self) -> &[u8] {
        &self.bin
    }

    /// Raw ed25519 public key bytes.
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        let mut key = [0u8; PUBLIC_KEY_LEN];
        key.copy_from_slice(&self.bin[1..]);
        key
    }

    /// Public key as a verifier. Fails if the bytes are not a curve point.
    pub fn verifying_key(&self) -> Result<VerifyingKey, TxnError> {
        VerifyingKey::from_bytes(&self.public_key_bytes())
            .map_err(|_| TxnError::InvalidAddress("not a valid ed25519 point".to_string()))
    }
}

impl std::fmt::Display for HeliumAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_b58())
    }
}

impl std::fmt::Debug for HeliumAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HeliumAddress({})", self.to_b58())
    }
}

fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}
