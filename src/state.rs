// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::onboarding::OnboardingService;

#[derive(Clone)]
pub struct AppState {
    pub onboarding: Arc<OnboardingService>,
}

impl AppState {
    pub fn new(onboarding: Arc<OnboardingService>) -> Self {
        Self { onboarding }
    }
}
