//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use reqwest::Url;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::rerank::DEFAULT_ENDPOINT;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Upstream rerank API settings.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.upstream.endpoint).map_err(|e| ConfigError::ValidationError {
            message: format!("Invalid upstream endpoint '{}': {e}", self.upstream.endpoint),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid upstream endpoint scheme '{}'. Must be http or https",
                    url.scheme()
                ),
            });
        }
        Ok(())
    }
}

/// Upstream rerank API configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Rerank endpoint URL.
    /// Default: the ZeroEntropy rerank endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let json = r"{}";
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.upstream.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "_comment": "Test config",
            "upstream": {
                "endpoint": "http://127.0.0.1:8080/v1/models/rerank"
            },
            "logging": {
                "level": "debug"
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.upstream.endpoint,
            "http://127.0.0.1:8080/v1/models/rerank"
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "warn");
    }

    #[test]
    fn reject_unparseable_endpoint() {
        let json = r#"{ "upstream": { "endpoint": "not a url" } }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_non_http_endpoint() {
        let json = r#"{ "upstream": { "endpoint": "ftp://example.com/rerank" } }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("scheme"));
    }

    #[test]
    fn reject_api_key_in_config() {
        let json = r#"{ "upstream": { "api_key": "secret" } }"#;

        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn reject_unknown_fields() {
        let json = r#"{
            "unknown_field": "value"
        }"#;

        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
