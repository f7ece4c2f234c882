//! HTTP Routes
//!
//! The non-WebSocket surface: the dashboard page and a health endpoint.

use axum::{extract::State, response::Html, Json};
use serde::Serialize;
use std::sync::Arc;

use super::state::AppState;
use crate::render;

/// GET /
///
/// The dashboard page. htmx on the page opens the `/ws` connection and
/// swaps broadcast fragments into place.
pub async fn index() -> Html<&'static str> {
    Html(render::INDEX_HTML)
}

/// Health endpoint response body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub subscribers: usize,
    pub version: String,
}

/// GET /health
///
/// Process status plus the current subscriber count.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_seconds: state.uptime_seconds(),
        subscribers: state.hub.subscriber_count().await,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
