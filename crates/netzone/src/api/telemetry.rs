//! Telemetry ingestion handlers.

use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;

use netzone_core::{IngestStats, ProvisionOutcome, TelemetryRecord};

use super::error::ApiError;
use super::extract::ApiJson;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub queued: usize,
}

/// Resolve and provision one record before answering.
pub async fn ingest_record(
    State(state): State<AppState>,
    ApiJson(record): ApiJson<TelemetryRecord>,
) -> Result<Json<ProvisionOutcome>, ApiError> {
    let outcome = state.engine.ingest(&record).await?;
    Ok(Json(outcome))
}

/// Hand a batch to the worker pool. Outcomes show up in `/telemetry/stats`.
pub async fn enqueue_records(
    State(state): State<AppState>,
    ApiJson(records): ApiJson<Vec<TelemetryRecord>>,
) -> Result<(StatusCode, Json<QueuedResponse>), ApiError> {
    let queued = records.len();
    for record in records {
        state.ingest.submit(record).await?;
    }
    Ok((StatusCode::ACCEPTED, Json(QueuedResponse { queued })))
}

pub async fn ingest_stats(State(state): State<AppState>) -> Json<IngestStats> {
    Json(state.ingest.stats())
}
