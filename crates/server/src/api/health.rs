use axum::Json;
use axum::extract::State;
use serde::Serialize;

use roombook_gateway::MetricsSnapshot;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub metrics: MetricsSnapshot,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        metrics: state.gateway.metrics().snapshot(),
    })
}
