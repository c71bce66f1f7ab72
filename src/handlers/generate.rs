use axum::{extract::State, Json};
use serde_json::Value;

use crate::error::ProxyError;
use crate::models::GenerateRequest;
use crate::startup::AppState;

/// Relay one prompt to the upstream provider and return its JSON body
/// verbatim. Failures are normalized to `{"error": ...}` by `ProxyError`.
pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<Value>, ProxyError> {
    tracing::debug!(prompt_len = request.prompt.len(), "Relaying prompt upstream");

    let body = state
        .gemini
        .generate_content(&request.prompt)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Upstream call failed");
            ProxyError::from(e)
        })?;

    Ok(Json(body))
}

/// Fallback for unsupported methods on the proxy route. OPTIONS never
/// reaches this point; the CORS layer answers preflight directly.
pub async fn method_not_allowed() -> ProxyError {
    ProxyError::MethodNotAllowed
}
