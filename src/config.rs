//! Client configuration
//!
//! [`ClientConfig`] can be built in code or loaded from a JSON file; the CLI
//! overlays its flags on top of whatever the file provides.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    /// Config file is not valid JSON for [`ClientConfig`]
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration for [`crate::api::ApiClient`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Prefix prepended to every request path
    #[serde(rename = "baseURL", alias = "baseUrl")]
    pub base_url: String,

    /// Headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Whether success bodies are passed to the installed response validator
    #[serde(default = "default_validate_responses")]
    pub validate_responses: bool,
}

fn default_validate_responses() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            headers: BTreeMap::new(),
            validate_responses: default_validate_responses(),
        }
    }
}

impl ClientConfig {
    /// Creates a config for `base_url` with no default headers
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Adds a default header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets whether responses are validated
    pub fn with_validation(mut self, validate_responses: bool) -> Self {
        self.validate_responses = validate_responses;
        self
    }

    /// Loads configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)?;
        tracing::debug!(path = %path.display(), "Loaded client configuration");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_validates_responses() {
        let config = ClientConfig::default();
        assert!(config.base_url.is_empty());
        assert!(config.headers.is_empty());
        assert!(config.validate_responses);
    }

    #[test]
    fn test_builder_methods() {
        let config = ClientConfig::new("https://api.test")
            .with_header("Authorization", "Bearer t")
            .with_validation(false);

        assert_eq!(config.base_url, "https://api.test");
        assert_eq!(
            config.headers.get("Authorization").map(String::as_str),
            Some("Bearer t")
        );
        assert!(!config.validate_responses);
    }

    #[test]
    fn test_load_from_file_with_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("client.json");
        fs::write(&path, r#"{"baseURL": "https://api.test"}"#).unwrap();

        let config = ClientConfig::load(&path).unwrap();

        assert_eq!(config.base_url, "https://api.test");
        assert!(config.headers.is_empty());
        assert!(config.validate_responses);
    }

    #[test]
    fn test_load_full_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("client.json");
        fs::write(
            &path,
            r#"{"baseUrl": "http://localhost:1", "headers": {"x-a": "1"}, "validateResponses": false}"#,
        )
        .unwrap();

        let config = ClientConfig::load(&path).unwrap();

        assert_eq!(config.base_url, "http://localhost:1");
        assert_eq!(config.headers.get("x-a").map(String::as_str), Some("1"));
        assert!(!config.validate_responses);
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = ClientConfig::load(&temp_dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read(_)));
    }

    #[test]
    fn test_load_invalid_file_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("client.json");
        fs::write(&path, "{").unwrap();

        let err = ClientConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
