// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ordered business checks on a device transaction.
//!
//! The checks run in a fixed order and the first failure wins:
//!
//! 1. classify the wire string
//! 2. nonce ceiling (location assertions only): reject iff `nonce > limit`
//! 3. declared payer is the maker
//! 4. address gate: past the adoption threshold the gateway must equal the
//!    lookup key
//! 5. reuse: a bound record only accepts its own address
//!
//! Nothing here performs I/O or mutates state.

use crate::helium::{HeliumAddress, HeliumTxn};
use crate::storage::{Hotspot, Maker};

use super::error::OnboardError;

/// Inputs the checks are evaluated against.
pub struct ValidationContext<'a> {
    pub maker: &'a Maker,
    pub hotspot: &'a Hotspot,
    /// Key the record was looked up with (onboarding key or address).
    pub lookup_key: &'a str,
    /// Records with an id above this must present the lookup key as gateway.
    pub address_gate_min_hotspot_id: u64,
}

/// A transaction that passed every check.
#[derive(Debug)]
pub struct ValidatedTxn {
    pub txn: HeliumTxn,
    pub gateway: HeliumAddress,
}

impl ValidatedTxn {
    pub fn gateway_b58(&self) -> String {
        self.gateway.to_b58()
    }
}

pub fn classify_and_validate(wire: &str, ctx: &ValidationContext<'_>) -> Result<ValidatedTxn, OnboardError> {
    let txn = HeliumTxn::classify(wire)?;
    validate(txn, ctx)
}

pub fn validate(txn: HeliumTxn, ctx: &ValidationContext<'_>) -> Result<ValidatedTxn, OnboardError> {
    if let Some(nonce) = txn.nonce() {
        let limit = ctx.maker.location_nonce_limit;
        if nonce > u64::from(limit) {
            tracing::info!(maker_id = ctx.maker.id, nonce, limit, "Nonce limit exceeded");
            return Err(OnboardError::NonceLimitExceeded { nonce, limit });
        }
    }

    let payer = txn.payer()?.map(|p| p.to_b58());
    if payer.as_deref() != Some(ctx.maker.address.as_str()) {
        tracing::info!(maker_id = ctx.maker.id, kind = txn.kind().as_str(), "Payer is not the maker");
        return Err(OnboardError::InvalidPayer);
    }

    let gateway = txn.gateway()?;
    let gateway_b58 = gateway.to_b58();
    if ctx.hotspot.id > ctx.address_gate_min_hotspot_id && gateway_b58 != ctx.lookup_key {
        tracing::info!(hotspot_id = ctx.hotspot.id, "Gateway does not match lookup key");
        return Err(OnboardError::InvalidHotspotAddress);
    }

    if let Some(bound) = &ctx.hotspot.public_address {
        if *bound != gateway_b58 {
            tracing::info!(hotspot_id = ctx.hotspot.id, "Onboarding key already bound to another address");
            return Err(OnboardError::OnboardingKeyAlreadyUsed);
        }
    }

    Ok(ValidatedTxn { txn, gateway })
}
