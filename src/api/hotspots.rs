// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Maker-scoped hotspot registry. The gateway in front of this service
//! authenticates the maker named in the path.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{ApiError, ErrorBody},
    models::PageParams,
    state::AppState,
    storage::{Hotspot, HotspotFilter, HotspotUpdate, NewHotspot},
};

#[utoipa::path(
    get,
    path = "/v2/makers/{maker_id}/hotspots",
    params(("maker_id" = u64, Path, description = "Maker identifier"), PageParams),
    tag = "Hotspots",
    responses((status = 200, body = [Hotspot]), (status = 404, body = ErrorBody))
)]
pub async fn list_hotspots(
    Path(maker_id): Path<u64>,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<Hotspot>>, ApiError> {
    let hotspots = state
        .onboarding
        .maker_hotspots(maker_id, params.page(), params.page_size())?;
    Ok(Json(hotspots))
}

#[utoipa::path(
    post,
    path = "/v2/makers/{maker_id}/hotspots",
    params(("maker_id" = u64, Path, description = "Maker identifier")),
    request_body = NewHotspot,
    tag = "Hotspots",
    responses(
        (status = 201, body = Hotspot),
        (status = 404, body = ErrorBody),
        (status = 422, description = "Onboarding key missing or taken", body = ErrorBody)
    )
)]
pub async fn create_hotspot(
    Path(maker_id): Path<u64>,
    State(state): State<AppState>,
    Json(request): Json<NewHotspot>,
) -> Result<(StatusCode, Json<Hotspot>), ApiError> {
    let hotspot = state.onboarding.register_hotspot(maker_id, request)?;
    Ok((StatusCode::CREATED, Json(hotspot)))
}

#[utoipa::path(
    get,
    path = "/v2/makers/{maker_id}/hotspots/search",
    params(("maker_id" = u64, Path, description = "Maker identifier"), HotspotFilter),
    tag = "Hotspots",
    responses((status = 200, body = [Hotspot]), (status = 404, body = ErrorBody))
)]
pub async fn search_hotspots(
    Path(maker_id): Path<u64>,
    State(state): State<AppState>,
    Query(filter): Query<HotspotFilter>,
) -> Result<Json<Vec<Hotspot>>, ApiError> {
    Ok(Json(state.onboarding.search_hotspots(maker_id, &filter)?))
}

#[utoipa::path(
    get,
    path = "/v2/makers/{maker_id}/hotspots/{hotspot_id}",
    params(
        ("maker_id" = u64, Path, description = "Maker identifier"),
        ("hotspot_id" = u64, Path, description = "Hotspot identifier")
    ),
    tag = "Hotspots",
    responses((status = 200, body = Hotspot), (status = 404, body = ErrorBody))
)]
pub async fn get_hotspot(
    Path((maker_id, hotspot_id)): Path<(u64, u64)>,
    State(state): State<AppState>,
) -> Result<Json<Hotspot>, ApiError> {
    Ok(Json(state.onboarding.maker_hotspot(maker_id, hotspot_id)?))
}

#[utoipa::path(
    put,
    path = "/v2/makers/{maker_id}/hotspots/{hotspot_id}",
    params(
        ("maker_id" = u64, Path, description = "Maker identifier"),
        ("hotspot_id" = u64, Path, description = "Hotspot identifier")
    ),
    request_body = HotspotUpdate,
    tag = "Hotspots",
    responses(
        (status = 200, body = Hotspot),
        (status = 404, body = ErrorBody),
        (status = 422, description = "Hotspot is bound", body = ErrorBody)
    )
)]
pub async fn update_hotspot(
    Path((maker_id, hotspot_id)): Path<(u64, u64)>,
    State(state): State<AppState>,
    Json(request): Json<HotspotUpdate>,
) -> Result<Json<Hotspot>, ApiError> {
    Ok(Json(state.onboarding.update_hotspot(maker_id, hotspot_id, request)?))
}

#[utoipa::path(
    delete,
    path = "/v2/makers/{maker_id}/hotspots/{hotspot_id}",
    params(
        ("maker_id" = u64, Path, description = "Maker identifier"),
        ("hotspot_id" = u64, Path, description = "Hotspot identifier")
    ),
    tag = "Hotspots",
    responses(
        (status = 200, body = Hotspot),
        (status = 404, body = ErrorBody),
        (status = 422, description = "Hotspot is bound", body = ErrorBody)
    )
)]
pub async fn delete_hotspot(
    Path((maker_id, hotspot_id)): Path<(u64, u64)>,
    State(state): State<AppState>,
) -> Result<Json<Hotspot>, ApiError> {
    Ok(Json(state.onboarding.delete_hotspot(maker_id, hotspot_id)?))
}

/// Look a record up by onboarding key or bound public address.
#[utoipa::path(
    get,
    path = "/v2/hotspots/{key}",
    params(("key" = String, Path, description = "Onboarding key or public address")),
    tag = "Hotspots",
    responses((status = 200, body = Hotspot), (status = 404, body = ErrorBody))
)]
pub async fn lookup_hotspot(
    Path(key): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Hotspot>, ApiError> {
    Ok(Json(state.onboarding.lookup_hotspot(&key)?))
}
