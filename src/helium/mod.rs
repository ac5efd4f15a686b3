// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Legacy ledger wire format.
//!
//! This module provides:
//! - Base58check addresses wrapping ed25519 public keys
//! - Protobuf transaction envelopes and the three variants the maker co-signs
//! - Classification of a base64 wire string into a typed transaction

pub mod address;
pub mod txn;

pub use address::HeliumAddress;
pub use txn::{HeliumTxn, TxnError, TxnKind};
