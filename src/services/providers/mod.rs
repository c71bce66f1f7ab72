//! Upstream provider client.
//!
//! The proxy talks to exactly one provider (Gemini); there is deliberately
//! no provider trait here.

pub mod gemini;

use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),
}
