use axum::body::{Body, to_bytes};
use axum::http::{Request, Response};
use tokio_util::sync::CancellationToken;

use netzone_core::{Engine, IngestPipeline};

use crate::state::AppState;

/// In-memory engine with a small ingestion pool. The workers stop when the
/// returned state (and every clone of it) is dropped.
pub fn test_app_state() -> AppState {
    state_with(false)
}

pub fn read_only_app_state() -> AppState {
    state_with(true)
}

fn state_with(read_only: bool) -> AppState {
    let engine = Engine::in_memory();
    let pipeline = IngestPipeline::spawn(engine.clone(), 2, 16, CancellationToken::new());
    AppState::new(engine, pipeline.handle(), read_only)
}

pub fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
