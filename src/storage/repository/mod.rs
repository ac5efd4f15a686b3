// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the onboarding database.
//!
//! Each repository provides CRUD operations for a specific entity type,
//! using [`OnboardingDb`](super::OnboardingDb) for all transactions.

pub mod hotspots;
pub mod makers;

pub use hotspots::{
    BindOutcome, Hotspot, HotspotFilter, HotspotRepository, HotspotUpdate, NewHotspot, DEFAULT_PAGE_SIZE,
};
pub use makers::{Maker, MakerRepository, MakerWithSecret, NewMaker};
