// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::{ApiError, ErrorBody},
    state::AppState,
    storage::Maker,
};

#[utoipa::path(
    get,
    path = "/v2/makers",
    tag = "Makers",
    responses((status = 200, body = [Maker]))
)]
pub async fn list_makers(State(state): State<AppState>) -> Result<Json<Vec<Maker>>, ApiError> {
    Ok(Json(state.onboarding.makers()?))
}

#[utoipa::path(
    get,
    path = "/v2/makers/{maker_id}",
    params(("maker_id" = u64, Path, description = "Maker identifier")),
    tag = "Makers",
    responses((status = 200, body = Maker), (status = 404, body = ErrorBody))
)]
pub async fn get_maker(
    Path(maker_id): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<Maker>, ApiError> {
    Ok(Json(state.onboarding.maker(maker_id)?))
}
