// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Static information consumed by device tooling.

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

/// Location-assertion budget reported to legacy CLI clients.
pub const LEGACY_LOCATION_NONCE: u32 = 3;

/// Oldest firmware allowed to onboard.
pub const REQUIRED_FIRMWARE_VERSION: &str = "2019.11.06.0";

#[derive(Debug, Serialize, ToSchema)]
pub struct LimitsResponse {
    pub location_nonce: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FirmwareResponse {
    pub version: &'static str,
}

#[utoipa::path(
    get,
    path = "/v1/limits",
    tag = "Device",
    responses((status = 200, body = LimitsResponse))
)]
pub async fn limits() -> Json<LimitsResponse> {
    Json(LimitsResponse {
        location_nonce: LEGACY_LOCATION_NONCE,
    })
}

#[utoipa::path(
    get,
    path = "/v2/firmware",
    tag = "Device",
    responses((status = 200, body = FirmwareResponse))
)]
pub async fn firmware() -> Json<FirmwareResponse> {
    Json(FirmwareResponse {
        version: REQUIRED_FIRMWARE_VERSION,
    })
}
