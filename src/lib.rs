// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Hotspot Onboarding Server - Maker Transaction Authority
//!
//! Holds each maker's signing key, validates transactions built by hotspot
//! devices and co-signs them as the maker, either on the legacy ledger or
//! as compressed-asset transactions on the new ledger.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `blockchain` - New-ledger transaction format, instructions and RPC
//! - `custody` - Versioned key ring sealing maker entropy
//! - `helium` - Legacy transaction wire format
//! - `onboarding` - Validation, co-signing, capacity and binding flows
//! - `signing` - Signing domain, device signature checks and maker signer
//! - `storage` - Embedded database (redb)

pub mod api;
pub mod blockchain;
pub mod config;
pub mod custody;
pub mod error;
pub mod helium;
pub mod models;
pub mod onboarding;
pub mod signing;
pub mod state;
pub mod storage;
