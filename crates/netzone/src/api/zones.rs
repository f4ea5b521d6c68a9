//! Router zone inventory handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;

use netzone_core::{NewZone, RouterZone, ZoneId, ZoneUpdate};

use super::error::ApiError;
use super::extract::ApiJson;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ZonesResponse {
    pub zones: Vec<RouterZone>,
}

#[derive(Debug, Serialize)]
pub struct ZoneResponse {
    pub success: bool,
    pub zone: RouterZone,
}

#[derive(Debug, Serialize)]
pub struct DeleteZoneResponse {
    pub success: bool,
    pub devices_reassigned: usize,
}

pub async fn list_zones(State(state): State<AppState>) -> Result<Json<ZonesResponse>, ApiError> {
    let zones = state.engine.zones().await?;
    Ok(Json(ZonesResponse { zones }))
}

pub async fn get_zone(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ZoneResponse>, ApiError> {
    let zone = state.engine.zone(ZoneId(id)).await?;
    Ok(Json(ZoneResponse {
        success: true,
        zone,
    }))
}

pub async fn create_zone(
    State(state): State<AppState>,
    ApiJson(zone): ApiJson<NewZone>,
) -> Result<(StatusCode, Json<ZoneResponse>), ApiError> {
    state.ensure_writable()?;
    let zone = state.engine.create_zone(zone).await?;
    Ok((
        StatusCode::CREATED,
        Json(ZoneResponse {
            success: true,
            zone,
        }),
    ))
}

pub async fn update_zone(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(update): ApiJson<ZoneUpdate>,
) -> Result<Json<ZoneResponse>, ApiError> {
    state.ensure_writable()?;
    let zone = state.engine.update_zone(ZoneId(id), &update).await?;
    Ok(Json(ZoneResponse {
        success: true,
        zone,
    }))
}

pub async fn delete_zone(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteZoneResponse>, ApiError> {
    state.ensure_writable()?;
    let devices_reassigned = state.engine.delete_zone(ZoneId(id)).await?;
    Ok(Json(DeleteZoneResponse {
        success: true,
        devices_reassigned,
    }))
}
