use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::services::providers::ProviderError;

/// Error taxonomy for the proxy. Every variant is rendered to the caller
/// as an `{"error": ...}` JSON body with a fixed HTTP status.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Method not allowed: use POST with a JSON body {{\"prompt\": \"...\"}}")]
    MethodNotAllowed,

    #[error("{0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Upstream transport error: {0}")]
    UpstreamTransport(String),

    #[error("{message}")]
    UpstreamApi { status: u16, message: String },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for ProxyError {
    fn from(err: config::ConfigError) -> Self {
        ProxyError::Configuration(err.to_string())
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        ProxyError::Internal(anyhow::Error::new(err))
    }
}

impl From<ProviderError> for ProxyError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotConfigured(msg) => ProxyError::Configuration(msg),
            ProviderError::Network(msg) => ProxyError::UpstreamTransport(msg),
            ProviderError::Api { status, message } => ProxyError::UpstreamApi { status, message },
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let (status, error) = match self {
            ProxyError::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, self.to_string()),
            ProxyError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ProxyError::Configuration(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            ProxyError::UpstreamTransport(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            // The upstream status is collapsed to 500 for the caller; the
            // original status is preserved in the log line only.
            ProxyError::UpstreamApi { ref message, .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, message.clone())
            }
            ProxyError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_not_allowed_maps_to_405() {
        let response = ProxyError::MethodNotAllowed.into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn bad_request_maps_to_400_with_plain_message() {
        let err = ProxyError::BadRequest("Missing query parameter: q".to_string());
        assert_eq!(err.to_string(), "Missing query parameter: q");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn configuration_error_maps_to_500() {
        let response =
            ProxyError::Configuration("GEMINI_API_KEY is not set".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn upstream_api_error_surfaces_provider_message() {
        let err = ProxyError::from(ProviderError::Api {
            status: 429,
            message: "quota exceeded".to_string(),
        });
        assert_eq!(err.to_string(), "quota exceeded");
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn network_error_becomes_upstream_transport() {
        let err = ProxyError::from(ProviderError::Network("connection refused".to_string()));
        assert!(matches!(err, ProxyError::UpstreamTransport(_)));
    }
}
