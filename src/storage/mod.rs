// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Onboarding Storage
//!
//! Makers and hotspots live in a single embedded redb file under
//! `DATA_DIR`.
//!
//! ## Invariants enforced here
//!
//! - Maker names and onboarding keys are unique
//! - A hotspot's public address is written once, inside one write
//!   transaction that also claims the address in a unique index
//! - Bound hotspots cannot be updated or deleted
//! - Sealed entropy is only returned through the explicit secret-bearing
//!   maker read

pub mod database;
pub mod repository;

pub use database::{DbError, DbResult, OnboardingDb};
pub use repository::{
    BindOutcome, Hotspot, HotspotFilter, HotspotRepository, HotspotUpdate, Maker, MakerRepository,
    MakerWithSecret, NewHotspot, NewMaker,
};
