//! Router mapping handlers: tables, Netify policy, and the dry-run test.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

use netzone_core::{IdentityQuery, MappingConfig, MappingType, NetifySettings, PolicyPatch};

use super::error::ApiError;
use super::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddMappingRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveMappingRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub key: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSettingsRequest {
    #[serde(default)]
    pub netify_settings: PolicyPatch,
}

#[derive(Debug, Default, Deserialize)]
pub struct TestQuery {
    #[serde(default)]
    pub ip: String,
    pub interface: Option<String>,
    pub router_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub success: bool,
    pub netify_settings: NetifySettings,
}

#[derive(Debug, Serialize)]
struct TestFailure {
    test_result: TestFailureBody,
}

#[derive(Debug, Serialize)]
struct TestFailureBody {
    ip: String,
    error: String,
    field: &'static str,
}

pub async fn get_config(State(state): State<AppState>) -> Json<MappingConfig> {
    Json(state.engine.config().as_ref().clone())
}

pub async fn add_mapping(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AddMappingRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    state.ensure_writable()?;
    let kind = MappingType::parse(&req.kind)?;
    let previous = state.engine.add_mapping(kind, &req.key, &req.value).await?;
    let message = if previous.is_some() {
        format!("Mapping updated in {kind}")
    } else {
        format!("Mapping added to {kind}")
    };
    Ok(Json(MutationResponse {
        success: true,
        message,
        previous,
    }))
}

pub async fn remove_mapping(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RemoveMappingRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    state.ensure_writable()?;
    let kind = MappingType::parse(&req.kind)?;
    let removed = state.engine.remove_mapping(kind, &req.key).await?;
    Ok(Json(MutationResponse {
        success: true,
        message: format!("Mapping removed from {kind}"),
        previous: Some(removed),
    }))
}

pub async fn update_settings(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<UpdateSettingsRequest>,
) -> Result<Json<SettingsResponse>, ApiError> {
    state.ensure_writable()?;
    let netify_settings = state.engine.update_policy(&req.netify_settings).await?;
    Ok(Json(SettingsResponse {
        success: true,
        netify_settings,
    }))
}

/// Dry-run resolution. Validation failures keep the `test_result` envelope
/// so the dashboard can render them inline.
pub async fn test_mapping(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TestQuery>,
) -> Response {
    let mut identity = IdentityQuery::new(query.ip.clone());
    identity.interface = query.interface;
    identity.router_key = query.router_key;

    match state.engine.test(&identity).await {
        Ok(report) => Json(report).into_response(),
        Err(e) if e.is_validation() => (
            StatusCode::BAD_REQUEST,
            Json(TestFailure {
                test_result: TestFailureBody {
                    ip: query.ip,
                    error: e.to_string(),
                    field: e.field().unwrap_or("ip"),
                },
            }),
        )
            .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
