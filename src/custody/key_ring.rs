// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Versioned key ring and the envelope encryption built on it.
//!
//! Ciphertext layout: `nonce (24 bytes) || XChaCha20-Poly1305(entropy)`.
//! The associated data binds the key version, so a record whose stored
//! version was altered fails authentication instead of decrypting under the
//! wrong key.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::Entropy;

const NONCE_LEN: usize = 24;
const KEY_LEN: usize = 32;
const AAD_PREFIX: &[u8] = b"maker-entropy:v";

/// Errors raised by key custody.
///
/// Messages name key versions only, never key or entropy bytes.
#[derive(Debug, thiserror::Error)]
pub enum CustodyError {
    #[error("key ring entry {version} not found")]
    KeyNotFound { version: u32 },

    #[error("key ring is empty")]
    EmptyKeyRing,

    #[error("invalid key ring configuration: {0}")]
    InvalidKeyRing(String),

    #[error("entropy must be 32 bytes, got {0}")]
    InvalidEntropyLength(usize),

    #[error("sealed entropy is malformed")]
    MalformedCiphertext,

    #[error("failed to seal entropy with key version {version}")]
    EncryptionFailed { version: u32 },

    #[error("failed to unseal entropy with key version {version}")]
    DecryptionFailed { version: u32 },
}

/// A symmetric key-ring entry. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct KeyMaterial([u8; KEY_LEN]);

/// Entropy sealed under a key-ring entry, as persisted with the maker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedEntropy {
    /// `nonce || ciphertext || tag`, hex-encoded on disk.
    #[serde(with = "hex_bytes")]
    pub ciphertext: Vec<u8>,
    /// Key-ring entry the ciphertext was sealed with.
    pub key_version: u32,
}

/// Versioned set of symmetric keys.
///
/// Holds every historical entry so old ciphertexts stay readable; only the
/// current entry is used to seal.
pub struct KeyRing {
    entries: BTreeMap<u32, KeyMaterial>,
    current: u32,
}

impl KeyRing {
    /// Build a ring from `(version, key)` pairs.
    ///
    /// `current` defaults to the highest version.
    pub fn new(
        entries: impl IntoIterator<Item = (u32, [u8; KEY_LEN])>,
        current: Option<u32>,
    ) -> Result<Self, CustodyError> {
        let entries: BTreeMap<u32, KeyMaterial> = entries
            .into_iter()
            .map(|(version, key)| (version, KeyMaterial(key)))
            .collect();

        let current = match current {
            Some(version) if entries.contains_key(&version) => version,
            Some(version) => return Err(CustodyError::KeyNotFound { version }),
            None => *entries.keys().next_back().ok_or(CustodyError::EmptyKeyRing)?,
        };

        Ok(Self { entries, current })
    }

    /// Parse the `KEY_RING` configuration value: a JSON object mapping
    /// version numbers to 64-character hex keys.
    pub fn from_json(raw: &str, current: Option<u32>) -> Result<Self, CustodyError> {
        let parsed: HashMap<String, String> = serde_json::from_str(raw)
            .map_err(|e| CustodyError::InvalidKeyRing(format!("expected JSON object: {e}")))?;

        let mut entries = Vec::with_capacity(parsed.len());
        for (version, encoded) in parsed {
            let version: u32 = version
                .parse()
                .map_err(|_| CustodyError::InvalidKeyRing(format!("bad version `{version}`")))?;
            let mut bytes = hex::decode(encoded.trim()).map_err(|_| {
                CustodyError::InvalidKeyRing(format!("key {version} is not valid hex"))
            })?;
            if bytes.len() != KEY_LEN {
                bytes.zeroize();
                return Err(CustodyError::InvalidKeyRing(format!(
                    "key {version} must be {KEY_LEN} bytes"
                )));
            }
            let mut key = [0u8; KEY_LEN];
            key.copy_from_slice(&bytes);
            bytes.zeroize();
            entries.push((version, key));
        }

        Self::new(entries, current)
    }

    /// Version used for new encryptions.
    pub fn current_version(&self) -> u32 {
        self.current
    }

    /// Add a new entry and make it current. Existing entries are kept.
    pub fn rotate(&mut self, version: u32, key: [u8; KEY_LEN]) -> Result<(), CustodyError> {
        if self.entries.contains_key(&version) {
            return Err(CustodyError::InvalidKeyRing(format!(
                "key version {version} already exists"
            )));
        }
        self.entries.insert(version, KeyMaterial(key));
        self.current = version;
        Ok(())
    }

    fn cipher(&self, version: u32) -> Result<XChaCha20Poly1305, CustodyError> {
        let key = self
            .entries
            .get(&version)
            .ok_or(CustodyError::KeyNotFound { version })?;
        Ok(XChaCha20Poly1305::new((&key.0).into()))
    }
}

fn associated_data(version: u32) -> Vec<u8> {
    let mut aad = Vec::with_capacity(AAD_PREFIX.len() + 4);
    aad.extend_from_slice(AAD_PREFIX);
    aad.extend_from_slice(&version.to_be_bytes());
    aad
}

/// Envelope encryption service over a shared, read-mostly key ring.
pub struct KeyCustodian {
    ring: RwLock<KeyRing>,
}

impl KeyCustodian {
    pub fn new(ring: KeyRing) -> Self {
        Self {
            ring: RwLock::new(ring),
        }
    }

    /// Current key version.
    pub fn current_version(&self) -> u32 {
        self.read_ring().current_version()
    }

    /// Whether the ring holds `version`.
    pub fn has_version(&self, version: u32) -> bool {
        self.read_ring().entries.contains_key(&version)
    }

    /// Introduce a new current key. Older entries remain for decryption.
    pub fn rotate(&self, version: u32, key: [u8; KEY_LEN]) -> Result<(), CustodyError> {
        let mut ring = self
            .ring
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        ring.rotate(version, key)?;
        tracing::info!(key_version = version, "Key ring rotated");
        Ok(())
    }

    /// Seal entropy with the current key-ring entry.
    pub fn encrypt(&self, entropy: &Entropy) -> Result<SealedEntropy, CustodyError> {
        let ring = self.read_ring();
        let version = ring.current_version();
        let cipher = ring.cipher(version)?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce);

        let sealed = cipher
            .encrypt(
                XNonce::from_slice(&nonce),
                Payload {
                    msg: entropy.expose(),
                    aad: &associated_data(version),
                },
            )
            .map_err(|_| CustodyError::EncryptionFailed { version })?;

        let mut ciphertext = Vec::with_capacity(NONCE_LEN + sealed.len());
        ciphertext.extend_from_slice(&nonce);
        ciphertext.extend_from_slice(&sealed);

        Ok(SealedEntropy {
            ciphertext,
            key_version: version,
        })
    }

    /// Unseal entropy with the entry named by `sealed.key_version`.
    pub fn decrypt(&self, sealed: &SealedEntropy) -> Result<Entropy, CustodyError> {
        let version = sealed.key_version;
        if sealed.ciphertext.len() <= NONCE_LEN {
            return Err(CustodyError::MalformedCiphertext);
        }

        let cipher = self.read_ring().cipher(version)?;
        let (nonce, body) = sealed.ciphertext.split_at(NONCE_LEN);
        let plaintext = cipher
            .decrypt(
                XNonce::from_slice(nonce),
                Payload {
                    msg: body,
                    aad: &associated_data(version),
                },
            )
            .map_err(|_| CustodyError::DecryptionFailed { version })?;

        Entropy::from_bytes(plaintext)
    }

    fn read_ring(&self) -> std::sync::RwLockReadGuard<'_, KeyRing> {
        self.ring.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(encoded).map_err(serde::de::Error::custom)
    }
}
