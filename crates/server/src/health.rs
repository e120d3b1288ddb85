use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use parley_core::ActionRegistry;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    registry: Arc<ActionRegistry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub actions: Vec<String>,
    pub checked_at: String,
}

pub fn router(registry: Arc<ActionRegistry>) -> Router {
    Router::new()
        .route("/health", get(health).options(health))
        .with_state(HealthState { registry })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        actions: state.registry.names().into_iter().map(str::to_owned).collect(),
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}
