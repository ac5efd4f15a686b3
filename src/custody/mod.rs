// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Maker Key Custody
//!
//! Envelope encryption of maker signing-key entropy under a versioned key ring.
//!
//! ## Security Model
//!
//! - New secrets are always sealed with the *current* key-ring entry
//! - The entry version is stored next to the ciphertext, so rotation never
//!   requires re-encrypting historical records
//! - A missing version is a fatal configuration error (`KeyNotFound`), never a
//!   silent fallback to another key or to plaintext
//! - Plaintext [`Entropy`] is zeroized on drop and has no `Serialize` or
//!   revealing `Debug` impl
//!
//! Custody is an explicit service: callers seal entropy at provisioning time
//! and unseal it on every secret-reading path. Storage never does either
//! implicitly.

pub mod entropy;
pub mod key_ring;

pub use entropy::{Entropy, ENTROPY_LEN};
pub use key_ring::{CustodyError, KeyCustodian, KeyRing, SealedEntropy};
