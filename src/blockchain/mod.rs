// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger integration for the compressed-asset network.
//!
//! This module provides functionality for:
//! - Deriving program addresses and decoding the accounts the flows read
//! - Building entity-manager and compression instructions
//! - Compiling, partially signing and serializing legacy transactions
//! - Talking to the RPC node and the asset indexer

pub mod account_cache;
pub mod accounts;
pub mod borsh;
pub mod client;
pub mod instructions;
pub mod programs;
pub mod reader;
pub mod transaction;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ChainRpc, HttpChainClient, RpcError};
pub use programs::{LedgerContext, ProgramIds, SubNetwork};
pub use reader::ChainReader;
pub use transaction::LedgerTransaction;
pub use types::{Hash, Instruction, LedgerError, Pubkey};
