//! HTTP sink configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the HTTP resumable upload sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSinkConfig {
    /// Upload initiation endpoint (e.g., "https://media.example.com/upload/videos").
    pub endpoint: String,

    /// Base URL for collection management. Defaults to `endpoint` when unset.
    #[serde(default)]
    pub collections_endpoint: Option<String>,

    /// Bearer token sent with every request.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Per-request timeout in seconds (default: 120).
    /// Applies to each chunk PUT, so it must cover one chunk at the throttled rate.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    120
}

impl HttpSinkConfig {
    /// Create a config for the given endpoint with default settings.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            collections_endpoint: None,
            access_token: None,
            timeout_secs: default_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal() {
        let config: HttpSinkConfig = toml::from_str(
            r#"
            endpoint = "https://media.example.com/upload"
        "#,
        )
        .unwrap();
        assert_eq!(config.endpoint, "https://media.example.com/upload");
        assert!(config.access_token.is_none());
        assert_eq!(config.timeout_secs, 120);
    }

    #[test]
    fn test_deserialize_full() {
        let config: HttpSinkConfig = toml::from_str(
            r#"
            endpoint = "https://media.example.com/upload"
            collections_endpoint = "https://media.example.com/api"
            access_token = "abc"
            timeout_secs = 30
        "#,
        )
        .unwrap();
        assert_eq!(
            config.collections_endpoint.as_deref(),
            Some("https://media.example.com/api")
        );
        assert_eq!(config.access_token.as_deref(), Some("abc"));
        assert_eq!(config.timeout_secs, 30);
    }
}
