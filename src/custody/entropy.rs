// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Plaintext maker entropy.

use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::CustodyError;

/// Entropy length in bytes. The maker keypair is derived from exactly this
/// many bytes.
pub const ENTROPY_LEN: usize = 32;

/// Raw random seed from which a maker keypair is derived.
///
/// Wiped from memory when dropped. Deliberately not `Clone`, `Serialize` or
/// `Display`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Entropy([u8; ENTROPY_LEN]);

impl Entropy {
    /// Generate fresh entropy from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; ENTROPY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Take ownership of raw entropy bytes.
    ///
    /// The input buffer is zeroized whether or not the length is valid.
    pub fn from_bytes(mut bytes: Vec<u8>) -> Result<Self, CustodyError> {
        if bytes.len() != ENTROPY_LEN {
            let len = bytes.len();
            bytes.zeroize();
            return Err(CustodyError::InvalidEntropyLength(len));
        }
        let mut out = [0u8; ENTROPY_LEN];
        out.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self(out))
    }

    /// Parse hex-encoded entropy (the format makers export their seed in).
    pub fn from_hex(encoded: &str) -> Result<Self, CustodyError> {
        let bytes = hex::decode(encoded.trim())
            .map_err(|_| CustodyError::InvalidEntropyLength(encoded.len() / 2))?;
        Self::from_bytes(bytes)
    }

    /// Borrow the secret bytes.
    pub fn expose(&self) -> &[u8; ENTROPY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for Entropy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Entropy(<redacted>)")
    }
}
