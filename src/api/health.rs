use crate::api::schemas::health::HealthResponse;
use axum::{Json, http::StatusCode, response::IntoResponse};

/// Liveness probe: returns 200 OK as long as the server is running.
pub async fn livez() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness probe. The service keeps no connections open between requests
/// (the provider is dialed per call), so readiness equals liveness here.
pub async fn readyz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok".to_string() }))
}
