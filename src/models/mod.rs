use serde::Deserialize;

/// Inbound payload for the proxy endpoint.
#[derive(Deserialize, Debug)]
pub struct GenerateRequest {
    /// Text forwarded upstream byte-for-byte (JSON escaping only).
    pub prompt: String,
}
