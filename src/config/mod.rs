use crate::error::ProxyError;
use config::{Config as Cfg, File};
use serde::Deserialize;
use std::env;

/// Default outbound call bound in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Base URL of the generative-language API.
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// RSS search endpoint of Google News.
const DEFAULT_NEWS_BASE: &str = "https://news.google.com/rss/search";

/// Default bound on each individual feed fetch in seconds.
const DEFAULT_FEED_TIMEOUT_SECS: u64 = 8;

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub common: CommonConfig,
    pub gemini: GeminiSettings,
    pub news: NewsSettings,
}

/// Settings shared by every deployment: currently just the listen port.
#[derive(Debug, Clone, Deserialize)]
pub struct CommonConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// Upstream credential. May be empty in dev/test; the handler rejects
    /// requests until it is set.
    pub api_key: String,
    /// Model identifier appended to the upstream path (e.g. gemini-2.0-flash).
    pub model: String,
    /// Upstream base URL. Overridden in tests to point at a mock.
    pub api_base: String,
    /// When true, the outbound body carries
    /// generationConfig.response_mime_type = application/json.
    pub force_json_output: bool,
    /// Bound on the outbound call.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct NewsSettings {
    /// RSS search endpoint. Overridden in tests to point at a mock.
    pub base_url: String,
    /// Bound on each individual feed fetch.
    pub timeout_secs: u64,
}

impl CommonConfig {
    pub fn load() -> Result<Self, ProxyError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

impl ProxyConfig {
    pub fn load() -> Result<Self, ProxyError> {
        let common = CommonConfig::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(ProxyConfig {
            common,
            gemini: GeminiSettings {
                // Empty outside prod so the process still starts without a
                // key; requests then fail with a configuration error.
                api_key: get_env("GEMINI_API_KEY", Some(""), is_prod)?,
                model: get_env("GEMINI_MODEL", Some("gemini-2.0-flash"), is_prod)?,
                api_base: get_env("GEMINI_API_BASE", Some(DEFAULT_API_BASE), is_prod)?,
                force_json_output: parse_or_default(
                    "GEMINI_FORCE_JSON_OUTPUT",
                    get_env("GEMINI_FORCE_JSON_OUTPUT", Some("true"), is_prod)?,
                    true,
                ),
                timeout_secs: parse_or_default(
                    "GEMINI_TIMEOUT_SECS",
                    get_env(
                        "GEMINI_TIMEOUT_SECS",
                        Some(&DEFAULT_TIMEOUT_SECS.to_string()),
                        is_prod,
                    )?,
                    DEFAULT_TIMEOUT_SECS,
                ),
            },
            news: NewsSettings {
                base_url: get_env("NEWS_RSS_BASE", Some(DEFAULT_NEWS_BASE), is_prod)?,
                timeout_secs: parse_or_default(
                    "NEWS_TIMEOUT_SECS",
                    get_env(
                        "NEWS_TIMEOUT_SECS",
                        Some(&DEFAULT_FEED_TIMEOUT_SECS.to_string()),
                        is_prod,
                    )?,
                    DEFAULT_FEED_TIMEOUT_SECS,
                ),
            },
        })
    }
}

fn parse_or_default<T: std::str::FromStr>(key: &str, raw: String, default: T) -> T {
    match raw.parse() {
        Ok(val) => val,
        Err(_) => {
            tracing::warn!("Unparseable value '{}' for {}, using default", raw, key);
            default
        }
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, ProxyError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(ProxyError::Configuration(format!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(ProxyError::Configuration(format!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses a distinct variable name; tests run in parallel and
    // the environment is process-wide.

    #[test]
    fn get_env_uses_default_when_unset_outside_prod() {
        let value = get_env("PROXY_CFG_TEST_UNSET", Some("fallback"), false).unwrap();
        assert_eq!(value, "fallback");
    }

    #[test]
    fn get_env_requires_value_in_prod() {
        let err = get_env("PROXY_CFG_TEST_PROD", Some("fallback"), true).unwrap_err();
        assert!(err.to_string().contains("PROXY_CFG_TEST_PROD"));
    }

    #[test]
    fn get_env_prefers_set_value() {
        env::set_var("PROXY_CFG_TEST_SET", "explicit");
        let value = get_env("PROXY_CFG_TEST_SET", Some("fallback"), false).unwrap();
        assert_eq!(value, "explicit");
    }

    #[test]
    fn parse_or_default_falls_back_on_garbage() {
        assert_eq!(parse_or_default("X", "not-a-number".to_string(), 30u64), 30);
        assert!(parse_or_default("X", "maybe".to_string(), true));
        assert_eq!(parse_or_default("X", "15".to_string(), 30u64), 15);
    }
}
