//! Gemini relay client.
//!
//! Issues the single outbound `generateContent` call and hands the provider's
//! JSON body back untouched. The proxy never inspects the semantic content of
//! the response.

use super::ProviderError;
use crate::config::GeminiSettings;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Gemini upstream client. Cheap to clone; the inner `reqwest::Client` is
/// reference-counted.
#[derive(Clone)]
pub struct GeminiClient {
    settings: GeminiSettings,
    client: Client,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self { settings, client })
    }

    /// Build the API URL for the configured model and the given method.
    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            self.settings.api_base, self.settings.model, method, self.settings.api_key
        )
    }

    /// Relay a prompt upstream and return the provider's JSON body verbatim.
    pub async fn generate_content(&self, prompt: &str) -> Result<Value, ProviderError> {
        if self.settings.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "GEMINI_API_KEY is not set".to_string(),
            ));
        }

        let request = GenerateContentRequest::new(prompt, self.settings.force_json_output);
        let url = self.api_url("generateContent");

        tracing::debug!(
            model = %self.settings.model,
            prompt_len = prompt.len(),
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // The provider wraps failures as {"error": {"message": ...}}.
            // Fall back to the raw status when the body has no message.
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Gemini API error: {}", status));

            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::Network(format!("Failed to parse response: {}", e)))
    }
}

// ============================================================================
// Gemini API Request Types
// ============================================================================
//
// The response is not modeled: it is relayed to the caller as an opaque
// serde_json::Value.

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    response_mime_type: String,
}

impl GenerateContentRequest {
    fn new(prompt: &str, force_json_output: bool) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: force_json_output.then(|| GenerationConfig {
                response_mime_type: "application/json".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(api_key: &str) -> GeminiSettings {
        GeminiSettings {
            api_key: api_key.to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            force_json_output: true,
            timeout_secs: 30,
        }
    }

    #[test]
    fn api_url_embeds_model_and_key() {
        let client = GeminiClient::new(settings("secret")).unwrap();
        assert_eq!(
            client.api_url("generateContent"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent?key=secret"
        );
    }

    #[test]
    fn request_body_carries_prompt_verbatim() {
        let prompt = "h\u{00e9}llo \"w\u{00f6}rld\"\nline two";
        let request = GenerateContentRequest::new(prompt, false);
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(
            body,
            json!({"contents": [{"parts": [{"text": prompt}]}]})
        );
    }

    #[test]
    fn forced_json_output_adds_generation_config() {
        let request = GenerateContentRequest::new("hello", true);
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(
            body,
            json!({
                "contents": [{"parts": [{"text": "hello"}]}],
                "generationConfig": {"response_mime_type": "application/json"}
            })
        );
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_any_network_io() {
        let client = GeminiClient::new(settings("")).unwrap();
        let err = client.generate_content("hello").await.unwrap_err();

        assert!(matches!(err, ProviderError::NotConfigured(_)));
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }
}
