//! Command-line interface parsing for the frontkit binary
//!
//! This module handles parsing of CLI arguments using clap and turning them
//! into a [`ClientConfig`] and request inputs.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use thiserror::Error;

use crate::config::{ClientConfig, ConfigError};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// A `--header` value is not `Name: value`
    #[error("Invalid header: '{0}'. Expected NAME:VALUE")]
    InvalidHeader(String),

    /// Neither `--base-url` nor a config file supplied a base URL
    #[error("No base URL: pass --base-url or a --config file with baseURL")]
    MissingBaseUrl,

    /// A JSON argument could not be parsed
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// The config file could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No directory is available for persisted state
    #[error("Could not determine a data directory; pass --data-dir")]
    NoDataDir,
}

/// frontkit - call JSON APIs, prefetch resources and inspect persisted state
#[derive(Parser, Debug)]
#[command(name = "frontkit")]
#[command(about = "Call JSON APIs, prefetch resources and inspect persisted state")]
#[command(version)]
pub struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch a path with GET and print the JSON body
    ///
    /// Examples:
    ///   frontkit get /users/1 --base-url https://api.example.com
    ///   frontkit get /users --base-url https://api.example.com --cache --repeat 3
    Get {
        /// Path appended to the base URL
        path: String,

        #[command(flatten)]
        client: ClientArgs,

        /// Serve repeated requests from the response cache
        #[arg(long)]
        cache: bool,

        /// Freshness window for cached responses (0 uses the 5000 ms default)
        #[arg(long, value_name = "MS", default_value_t = 5000)]
        cache_ms: u64,

        /// Number of times to issue the request
        #[arg(long, default_value_t = 1)]
        repeat: u32,
    },

    /// Send a JSON body with POST and print the JSON response
    Post {
        /// Path appended to the base URL
        path: String,

        #[command(flatten)]
        client: ClientArgs,

        /// Request body as JSON
        #[arg(long, value_name = "JSON")]
        data: String,
    },

    /// Prefetch resources and report how long it took
    Prefetch {
        /// URLs to prefetch
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Read a persisted value, or write one when VALUE is given
    ///
    /// VALUE is parsed as JSON; anything that is not valid JSON is stored as a
    /// string.
    State {
        /// Storage key
        key: String,

        /// New value
        value: Option<String>,

        /// Origin the value is scoped to
        #[arg(long, default_value = "frontkit-cli")]
        origin: String,

        /// Directory holding origin storage (defaults to the XDG data directory)
        #[arg(long, value_name = "DIR")]
        data_dir: Option<PathBuf>,
    },
}

/// Arguments shared by commands that talk to an API
#[derive(Args, Debug, Clone, Default)]
pub struct ClientArgs {
    /// Base URL prepended to the path (overrides the config file)
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// JSON client config file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Extra request header, repeatable
    #[arg(short = 'H', long = "header", value_name = "NAME:VALUE")]
    pub headers: Vec<String>,
}

impl ClientArgs {
    /// Builds the client configuration from the config file and flags
    ///
    /// Flags win over the file; headers given on the command line are added
    /// to (and override) the file's default headers.
    ///
    /// # Returns
    /// * `Ok(ClientConfig)` ready for [`ApiClient::new`](crate::api::ApiClient::new)
    /// * `Err(CliError::Config)` if the config file cannot be read or parsed
    /// * `Err(CliError::MissingBaseUrl)` if no base URL was given
    /// * `Err(CliError::InvalidHeader)` if a `--header` value is malformed
    pub fn to_config(&self) -> Result<ClientConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load(path)?,
            None => ClientConfig::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if config.base_url.is_empty() {
            return Err(CliError::MissingBaseUrl);
        }

        for raw in &self.headers {
            let (name, value) = parse_header(raw)?;
            config.headers.insert(name, value);
        }

        Ok(config)
    }
}

/// Parses a `Name: value` header argument
///
/// # Arguments
/// * `s` - The header string from CLI
///
/// # Returns
/// * `Ok((name, value))` with surrounding whitespace trimmed
/// * `Err(CliError::InvalidHeader)` if there is no colon or the name is empty
///   or contains whitespace
pub fn parse_header(s: &str) -> Result<(String, String), CliError> {
    let (name, value) = s
        .split_once(':')
        .ok_or_else(|| CliError::InvalidHeader(s.to_string()))?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(CliError::InvalidHeader(s.to_string()));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Parses a strict JSON argument
///
/// # Arguments
/// * `s` - The JSON text from CLI
///
/// # Returns
/// * `Ok(Value)` if `s` is valid JSON
/// * `Err(CliError::InvalidJson)` otherwise
pub fn parse_json_arg(s: &str) -> Result<Value, CliError> {
    serde_json::from_str(s).map_err(|e| CliError::InvalidJson(e.to_string()))
}

/// Parses a state value: JSON when possible, otherwise a plain string
pub fn parse_state_value(s: &str) -> Value {
    serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string()))
}
