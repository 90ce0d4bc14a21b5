use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::AppState;
use super::schemas::HealthResponse;

/// `GET /health` -- service status, operating address and a metrics snapshot.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let body = HealthResponse {
        status: "ok",
        address: state.pipeline.address().clone(),
        pending_uploads: state.uploads.len(),
        metrics: state.pipeline.metrics().snapshot(),
    };
    (StatusCode::OK, Json(body))
}

/// `GET /metrics` -- pipeline counters as JSON.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.pipeline.metrics().snapshot()))
}
