// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    blockchain::instructions::{DeploymentInfo, RadioInfo},
    error::ErrorBody,
    models::{
        CreateHotspotRequest, CreateMakerRequest, IotOnboardRequest, IotUpdateRequest, LocationInput,
        MobileOnboardRequest, MobileUpdateRequest, PayRequest, PayResponse, SolanaTransactionsResponse,
        UpdateNonceLimitRequest,
    },
    state::AppState,
    storage::{Hotspot, HotspotFilter, HotspotUpdate, Maker, NewHotspot},
};

pub mod admin;
pub mod device;
pub mod health;
pub mod hotspots;
pub mod makers;
pub mod transactions;

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/v1/transactions/pay/{onboarding_key}", post(transactions::pay_v1))
        .route("/v1/limits", get(device::limits))
        .route("/v2/firmware", get(device::firmware))
        .route("/v2/transactions/pay/{onboarding_key}", post(transactions::pay_v2))
        .route("/v3/transactions/create-hotspot", post(transactions::create_hotspot))
        .route("/v3/transactions/iot/onboard", post(transactions::onboard_iot))
        .route("/v3/transactions/mobile/onboard", post(transactions::onboard_mobile))
        .route(
            "/v3/transactions/iot/update-metadata",
            post(transactions::update_iot_metadata),
        )
        .route(
            "/v3/transactions/mobile/update-metadata",
            post(transactions::update_mobile_metadata),
        )
        .route("/v2/makers", get(makers::list_makers))
        .route("/v2/makers/{maker_id}", get(makers::get_maker))
        .route(
            "/v2/makers/{maker_id}/hotspots",
            get(hotspots::list_hotspots).post(hotspots::create_hotspot),
        )
        .route(
            "/v2/makers/{maker_id}/hotspots/search",
            get(hotspots::search_hotspots),
        )
        .route(
            "/v2/makers/{maker_id}/hotspots/{hotspot_id}",
            get(hotspots::get_hotspot)
                .put(hotspots::update_hotspot)
                .delete(hotspots::delete_hotspot),
        )
        .route("/v2/hotspots/{key}", get(hotspots::lookup_hotspot))
        .route("/admin/makers", post(admin::create_maker))
        .route(
            "/admin/makers/{maker_id}/nonce-limit",
            put(admin::update_nonce_limit),
        )
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::liveness,
        health::readiness,
        transactions::pay_v1,
        transactions::pay_v2,
        transactions::create_hotspot,
        transactions::onboard_iot,
        transactions::onboard_mobile,
        transactions::update_iot_metadata,
        transactions::update_mobile_metadata,
        makers::list_makers,
        makers::get_maker,
        hotspots::list_hotspots,
        hotspots::create_hotspot,
        hotspots::search_hotspots,
        hotspots::get_hotspot,
        hotspots::update_hotspot,
        hotspots::delete_hotspot,
        hotspots::lookup_hotspot,
        admin::create_maker,
        admin::update_nonce_limit,
        device::limits,
        device::firmware
    ),
    components(
        schemas(
            ErrorBody,
            Maker,
            Hotspot,
            NewHotspot,
            HotspotUpdate,
            HotspotFilter,
            PayRequest,
            PayResponse,
            CreateHotspotRequest,
            SolanaTransactionsResponse,
            IotOnboardRequest,
            MobileOnboardRequest,
            IotUpdateRequest,
            MobileUpdateRequest,
            LocationInput,
            DeploymentInfo,
            RadioInfo,
            CreateMakerRequest,
            UpdateNonceLimitRequest,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks,
            device::LimitsResponse,
            device::FirmwareResponse
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Transactions", description = "Co-signing of device and ledger transactions"),
        (name = "Makers", description = "Public maker information"),
        (name = "Hotspots", description = "Maker-scoped onboarding records"),
        (name = "Admin", description = "Maker provisioning"),
        (name = "Device", description = "Static limits and firmware requirements")
    )
)]
struct ApiDoc;
