// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction endpoints: legacy pay, mint, and sub-network onboarding.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::{ApiError, ErrorBody},
    models::{
        CreateHotspotRequest, IotOnboardRequest, IotUpdateRequest, MobileOnboardRequest, MobileUpdateRequest,
        PayRequest, PayResponse, SolanaTransactionsResponse,
    },
    onboarding::NetworkDetails,
    state::AppState,
};

async fn co_sign(state: &AppState, onboarding_key: &str, request: PayRequest) -> Result<Json<PayResponse>, ApiError> {
    let wire = request.transaction.unwrap_or_default();
    let artifact = state.onboarding.pay(onboarding_key, &wire).await?;
    Ok(Json(artifact.into()))
}

#[utoipa::path(
    post,
    path = "/v1/transactions/pay/{onboarding_key}",
    params(("onboarding_key" = String, Path, description = "Onboarding key or bound address")),
    request_body = PayRequest,
    tag = "Transactions",
    responses(
        (status = 200, body = PayResponse),
        (status = 404, body = ErrorBody),
        (status = 422, body = ErrorBody)
    )
)]
pub async fn pay_v1(
    Path(onboarding_key): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<PayRequest>,
) -> Result<Json<PayResponse>, ApiError> {
    co_sign(&state, &onboarding_key, request).await
}

/// Co-sign a device transaction as the maker.
///
/// Legacy domain answers `{ transaction }`, the new ledger answers
/// `{ solanaTransactions }`.
#[utoipa::path(
    post,
    path = "/v2/transactions/pay/{onboarding_key}",
    params(("onboarding_key" = String, Path, description = "Onboarding key or bound address")),
    request_body = PayRequest,
    tag = "Transactions",
    responses(
        (status = 200, body = PayResponse),
        (status = 400, description = "Gateway signature invalid", body = ErrorBody),
        (status = 404, body = ErrorBody),
        (status = 422, body = ErrorBody),
        (status = 503, description = "Signing domain unavailable", body = ErrorBody)
    )
)]
pub async fn pay_v2(
    Path(onboarding_key): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<PayRequest>,
) -> Result<Json<PayResponse>, ApiError> {
    co_sign(&state, &onboarding_key, request).await
}

/// Build the maker-signed issuance for a device AddGateway.
#[utoipa::path(
    post,
    path = "/v3/transactions/create-hotspot",
    request_body = CreateHotspotRequest,
    tag = "Transactions",
    responses(
        (status = 200, body = SolanaTransactionsResponse),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody),
        (status = 422, body = ErrorBody)
    )
)]
pub async fn create_hotspot(
    State(state): State<AppState>,
    Json(request): Json<CreateHotspotRequest>,
) -> Result<Json<SolanaTransactionsResponse>, ApiError> {
    let wire = request.transaction.unwrap_or_default();
    let transactions = state
        .onboarding
        .create_hotspot(&wire, request.payer.as_deref())
        .await?;
    Ok(Json(transactions.into()))
}

#[utoipa::path(
    post,
    path = "/v3/transactions/iot/onboard",
    request_body = IotOnboardRequest,
    tag = "Transactions",
    responses((status = 200, body = SolanaTransactionsResponse), (status = 404, body = ErrorBody))
)]
pub async fn onboard_iot(
    State(state): State<AppState>,
    Json(request): Json<IotOnboardRequest>,
) -> Result<Json<SolanaTransactionsResponse>, ApiError> {
    let details = NetworkDetails::Iot(request.details()?);
    let entity_key = request.entity_key.unwrap_or_default();
    let transactions = state
        .onboarding
        .onboard(&entity_key, request.payer.as_deref(), details)
        .await?;
    Ok(Json(transactions.into()))
}

#[utoipa::path(
    post,
    path = "/v3/transactions/mobile/onboard",
    request_body = MobileOnboardRequest,
    tag = "Transactions",
    responses((status = 200, body = SolanaTransactionsResponse), (status = 404, body = ErrorBody))
)]
pub async fn onboard_mobile(
    State(state): State<AppState>,
    Json(request): Json<MobileOnboardRequest>,
) -> Result<Json<SolanaTransactionsResponse>, ApiError> {
    let details = NetworkDetails::Mobile(request.details()?);
    let entity_key = request.entity_key.unwrap_or_default();
    let transactions = state
        .onboarding
        .onboard(&entity_key, request.payer.as_deref(), details)
        .await?;
    Ok(Json(transactions.into()))
}

#[utoipa::path(
    post,
    path = "/v3/transactions/iot/update-metadata",
    request_body = IotUpdateRequest,
    tag = "Transactions",
    responses(
        (status = 200, body = SolanaTransactionsResponse),
        (status = 404, body = ErrorBody),
        (status = 422, body = ErrorBody)
    )
)]
pub async fn update_iot_metadata(
    State(state): State<AppState>,
    Json(request): Json<IotUpdateRequest>,
) -> Result<Json<SolanaTransactionsResponse>, ApiError> {
    let details = NetworkDetails::Iot(request.details()?);
    let entity_key = request.entity_key.unwrap_or_default();
    let wallet = request.wallet.unwrap_or_default();
    let transactions = state
        .onboarding
        .update_metadata(&entity_key, &wallet, request.payer.as_deref(), details)
        .await?;
    Ok(Json(transactions.into()))
}

#[utoipa::path(
    post,
    path = "/v3/transactions/mobile/update-metadata",
    request_body = MobileUpdateRequest,
    tag = "Transactions",
    responses(
        (status = 200, body = SolanaTransactionsResponse),
        (status = 404, body = ErrorBody),
        (status = 422, body = ErrorBody)
    )
)]
pub async fn update_mobile_metadata(
    State(state): State<AppState>,
    Json(request): Json<MobileUpdateRequest>,
) -> Result<Json<SolanaTransactionsResponse>, ApiError> {
    let details = NetworkDetails::Mobile(request.details()?);
    let entity_key = request.entity_key.unwrap_or_default();
    let wallet = request.wallet.unwrap_or_default();
    let transactions = state
        .onboarding
        .update_metadata(&entity_key, &wallet, request.payer.as_deref(), details)
        .await?;
    Ok(Json(transactions.into()))
}
