// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Maker-scoped hotspot registry.

use crate::storage::{DbError, Hotspot, HotspotFilter, HotspotRepository, HotspotUpdate, NewHotspot};

use super::error::OnboardError;
use super::OnboardingService;

fn hotspot_error(e: DbError) -> OnboardError {
    match e {
        DbError::NotFound(_) => OnboardError::HotspotNotFound,
        other => other.into(),
    }
}

impl OnboardingService {
    pub fn register_hotspot(&self, maker_id: u64, new: NewHotspot) -> Result<Hotspot, OnboardError> {
        if new.onboarding_key.trim().is_empty() {
            return Err(OnboardError::MissingParam("onboardingKey"));
        }
        self.maker(maker_id)?;
        let hotspot = HotspotRepository::new(self.db()).create(maker_id, new)?;
        tracing::info!(
            maker_id,
            hotspot_id = hotspot.id,
            onboarding_key = %hotspot.onboarding_key,
            "Hotspot registered"
        );
        Ok(hotspot)
    }

    pub fn maker_hotspots(&self, maker_id: u64, page: usize, page_size: usize) -> Result<Vec<Hotspot>, OnboardError> {
        self.maker(maker_id)?;
        Ok(HotspotRepository::new(self.db()).list_for_maker(maker_id, page, page_size)?)
    }

    pub fn maker_hotspot(&self, maker_id: u64, id: u64) -> Result<Hotspot, OnboardError> {
        HotspotRepository::new(self.db())
            .get_for_maker(maker_id, id)?
            .ok_or(OnboardError::HotspotNotFound)
    }

    pub fn search_hotspots(&self, maker_id: u64, filter: &HotspotFilter) -> Result<Vec<Hotspot>, OnboardError> {
        self.maker(maker_id)?;
        Ok(HotspotRepository::new(self.db()).search(maker_id, filter)?)
    }

    /// Rejected with [`OnboardError::HotspotImmutable`] once bound.
    pub fn update_hotspot(&self, maker_id: u64, id: u64, update: HotspotUpdate) -> Result<Hotspot, OnboardError> {
        let hotspot = HotspotRepository::new(self.db())
            .update(maker_id, id, update)
            .map_err(hotspot_error)?;
        tracing::info!(maker_id, hotspot_id = id, "Hotspot updated");
        Ok(hotspot)
    }

    /// Rejected with [`OnboardError::HotspotImmutable`] once bound.
    pub fn delete_hotspot(&self, maker_id: u64, id: u64) -> Result<Hotspot, OnboardError> {
        let hotspot = HotspotRepository::new(self.db())
            .delete(maker_id, id)
            .map_err(hotspot_error)?;
        tracing::info!(maker_id, hotspot_id = id, "Hotspot deleted");
        Ok(hotspot)
    }

    /// Public lookup by onboarding key or bound address.
    pub fn lookup_hotspot(&self, key: &str) -> Result<Hotspot, OnboardError> {
        self.find_hotspot(key)
    }
}
