// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Operator endpoints for maker provisioning.
//!
//! These routes are expected to be reachable only from the operator network;
//! the service itself does not authenticate them.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    custody::Entropy,
    error::{ApiError, ErrorBody},
    models::{CreateMakerRequest, UpdateNonceLimitRequest},
    onboarding::OnboardError,
    state::AppState,
    storage::Maker,
};

/// Create a maker and seal its signing entropy.
///
/// Entropy is generated unless an existing key is imported as hex.
#[utoipa::path(
    post,
    path = "/admin/makers",
    request_body = CreateMakerRequest,
    tag = "Admin",
    responses(
        (status = 201, body = Maker),
        (status = 422, description = "Name missing or taken", body = ErrorBody)
    )
)]
pub async fn create_maker(
    State(state): State<AppState>,
    Json(request): Json<CreateMakerRequest>,
) -> Result<(StatusCode, Json<Maker>), ApiError> {
    let entropy = request
        .entropy
        .as_deref()
        .map(Entropy::from_hex)
        .transpose()
        .map_err(|_| OnboardError::InvalidInput("entropy must be 32 bytes of hex".to_string()))?;

    let maker = state.onboarding.provision_maker(
        request.name.as_deref().unwrap_or_default(),
        request.location_nonce_limit,
        entropy,
    )?;
    Ok((StatusCode::CREATED, Json(maker)))
}

#[utoipa::path(
    put,
    path = "/admin/makers/{maker_id}/nonce-limit",
    params(("maker_id" = u64, Path, description = "Maker identifier")),
    request_body = UpdateNonceLimitRequest,
    tag = "Admin",
    responses((status = 200, body = Maker), (status = 404, body = ErrorBody))
)]
pub async fn update_nonce_limit(
    Path(maker_id): Path<u64>,
    State(state): State<AppState>,
    Json(request): Json<UpdateNonceLimitRequest>,
) -> Result<Json<Maker>, ApiError> {
    let maker = state
        .onboarding
        .update_location_nonce_limit(maker_id, request.location_nonce_limit)?;
    Ok(Json(maker))
}
