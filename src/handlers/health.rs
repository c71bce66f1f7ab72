use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Health check endpoint for Docker/K8s liveness probes.
///
/// The proxy holds no stateful dependencies worth probing, so health is
/// unconditional liveness.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "gemini-proxy",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}
