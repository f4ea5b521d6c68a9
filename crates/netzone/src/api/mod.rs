//! HTTP API
//!
//! Router mapping administration, zone and device inventory, and telemetry
//! ingestion. Everything is mounted under `/api`.

mod devices;
pub mod error;
mod extract;
mod router_mapping;
mod telemetry;
mod zones;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod devices_tests;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        // Router mapping
        .route(
            "/router-mapping",
            get(router_mapping::get_config).put(router_mapping::update_settings),
        )
        .route("/router-mapping/config", get(router_mapping::get_config))
        .route("/router-mapping/add", post(router_mapping::add_mapping))
        .route("/router-mapping/remove", delete(router_mapping::remove_mapping))
        .route("/router-mapping/test", get(router_mapping::test_mapping))
        // Zones
        .route(
            "/router-zones",
            get(zones::list_zones).post(zones::create_zone),
        )
        .route(
            "/router-zones/:id",
            get(zones::get_zone)
                .put(zones::update_zone)
                .delete(zones::delete_zone),
        )
        // Devices
        .route(
            "/devices",
            get(devices::list_devices).post(devices::create_device),
        )
        .route("/devices/stats", get(devices::device_stats))
        .route(
            "/devices/:id",
            get(devices::get_device)
                .put(devices::update_device)
                .delete(devices::delete_device),
        )
        .route("/devices/:id/zone", put(devices::assign_device))
        // Telemetry
        .route("/telemetry", post(telemetry::ingest_record))
        .route("/telemetry/queue", post(telemetry::enqueue_records))
        .route("/telemetry/stats", get(telemetry::ingest_stats))
        .fallback(api_not_found)
}

/// Full application: the API under `/api` with request tracing and CORS.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn api_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": "Not found"})),
    )
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub revision: u64,
    pub read_only: bool,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        revision: state.engine.store().revision(),
        read_only: state.read_only(),
    })
}
