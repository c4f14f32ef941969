//! # API Client
//!
//! JSON HTTP client with optional short-lived caching of GET responses.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::cache::{ResponseCache, DEFAULT_CACHE_DURATION};
use super::error::{ApiError, ApiResult};
use super::transport::{Method, ReqwestTransport, Transport, TransportRequest, TransportResponse};
use crate::config::ClientConfig;
use crate::platform::{Clock, SystemClock};

/// Options for [`ApiClient::get`]
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    /// Serve from and store into the response cache
    pub cache: bool,
    /// Freshness window for cached responses (5 seconds when unset)
    pub cache_duration: Option<Duration>,
    /// Per-request headers, overriding the client defaults
    pub headers: BTreeMap<String, String>,
}

impl GetOptions {
    /// Options for a cached GET using the default freshness window
    pub fn cached() -> Self {
        Self {
            cache: true,
            ..Self::default()
        }
    }

    /// Sets the freshness window
    pub fn with_cache_duration(mut self, duration: Duration) -> Self {
        self.cache_duration = Some(duration);
        self
    }

    /// Adds a per-request header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Options for requests that are never cached
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Per-request headers, overriding the client defaults
    pub headers: BTreeMap<String, String>,
}

impl RequestOptions {
    /// Adds a per-request header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// A parsed success response
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
}

/// Pluggable check applied to every parsed success body
///
/// Runs only when [`ClientConfig::validate_responses`] is set.
pub trait ResponseValidator: Send + Sync {
    /// Returns an error message if the body is not acceptable
    fn validate(&self, body: &Value) -> Result<(), String>;
}

impl<F> ResponseValidator for F
where
    F: Fn(&Value) -> Result<(), String> + Send + Sync,
{
    fn validate(&self, body: &Value) -> Result<(), String> {
        self(body)
    }
}

/// HTTP client for a JSON API rooted at a base URL.
///
/// Each client owns its response cache; clones are not provided so that two
/// call sites never share a cache by accident. Wrap in an `Arc` to share.
///
/// # Examples
///
/// ```rust,ignore
/// use frontkit::api::{ApiClient, GetOptions};
/// use frontkit::config::ClientConfig;
///
/// let client = ApiClient::new(ClientConfig::new("https://api.example.com"));
/// let user: serde_json::Value = client.get("/users/1", GetOptions::cached()).await?;
/// ```
pub struct ApiClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    cache: ResponseCache,
    validator: Option<Arc<dyn ResponseValidator>>,
}

impl ApiClient {
    /// Creates a client using the reqwest transport and the system clock
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    /// Creates a client with a custom transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            clock: Arc::new(SystemClock),
            cache: ResponseCache::new(),
            validator: None,
        }
    }

    /// Replaces the clock used for cache timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Installs a response validator
    pub fn with_validator(mut self, validator: Arc<dyn ResponseValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Returns the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the response cache
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Fetches `path` with GET and parses the JSON body
    ///
    /// With `options.cache` set, a response stored less than
    /// `options.cache_duration` ago is returned without a network call, and a
    /// fresh response is stored for later calls.
    ///
    /// # Arguments
    /// * `path` - Path appended to the configured base URL
    /// * `options` - Caching switch, freshness window and per-call headers.
    ///   A missing or zero `cache_duration` uses [`DEFAULT_CACHE_DURATION`].
    ///
    /// # Returns
    /// * `Ok(T)` with the (possibly cached) response body
    ///
    /// # Errors
    ///
    /// * [`ApiError::Status`] - Non-success status
    /// * [`ApiError::Parse`] - Success body is not JSON of type `T`
    /// * [`ApiError::Request`] / [`ApiError::Transport`] - Request failed
    pub async fn get<T: DeserializeOwned>(&self, path: &str, options: GetOptions) -> ApiResult<T> {
        let url = self.url(path);
        let cache_key = ResponseCache::key(&url);

        if options.cache {
            // A zero window means "unset", not "never fresh"
            let max_age = options
                .cache_duration
                .filter(|d| !d.is_zero())
                .unwrap_or(DEFAULT_CACHE_DURATION);
            if let Some(cached) = self.cache.read(&cache_key, self.clock.now_ms(), max_age) {
                if !cached.is_expired {
                    tracing::debug!(key = %cache_key, "Serving cached response");
                    return Ok(serde_json::from_value(cached.data)?);
                }
            }
        }

        let request = TransportRequest {
            method: Method::Get,
            url,
            headers: self.merged_headers(None, &options.headers),
            body: None,
        };
        let response = self.send(request).await?;

        if options.cache {
            self.cache
                .write(&cache_key, response.data.clone(), self.clock.now_ms());
        }

        Ok(serde_json::from_value(response.data)?)
    }

    /// Sends `body` as JSON with POST and parses the JSON response
    ///
    /// Never reads or writes the response cache.
    ///
    /// # Arguments
    /// * `path` - Path appended to the configured base URL
    /// * `body` - Value serialized as the JSON request body
    /// * `options` - Per-call headers
    ///
    /// # Returns
    /// * `Ok(T)` with the parsed response body
    /// * `Err(ApiError)` as for [`get`](Self::get), plus
    ///   [`ApiError::Serialize`] when `body` cannot be serialized
    pub async fn post<B, T>(&self, path: &str, body: &B, options: RequestOptions) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::Post, path, Some(body), options).await
    }

    /// Sends `body` as JSON with PUT and parses the JSON response
    pub async fn put<B, T>(&self, path: &str, body: &B, options: RequestOptions) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::Put, path, Some(body), options).await
    }

    /// Sends a DELETE and parses the JSON response
    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> ApiResult<T> {
        self.send_json::<(), T>(Method::Delete, path, None, options)
            .await
    }

    async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ApiError::Serialize(e.to_string()))?;
        let content_type = body.as_ref().map(|_| "application/json");

        let request = TransportRequest {
            method,
            url: self.url(path),
            headers: self.merged_headers(content_type, &options.headers),
            body,
        };
        let response = self.send(request).await?;

        Ok(serde_json::from_value(response.data)?)
    }

    async fn send(&self, request: TransportRequest) -> ApiResult<ApiResponse<Value>> {
        tracing::debug!(method = %request.method, url = %request.url, "Sending request");
        let response = self.transport.send(request).await?;
        self.handle_response(response)
    }

    /// Turns a raw response into parsed JSON or a structured error
    fn handle_response(&self, response: TransportResponse) -> ApiResult<ApiResponse<Value>> {
        if !response.ok() {
            let data = response.json::<Value>().ok();
            return Err(ApiError::Status {
                status: response.status,
                status_text: response.status_text,
                data,
            });
        }

        let data: Value = response.json()?;

        if self.config.validate_responses {
            if let Some(ref validator) = self.validator {
                validator.validate(&data).map_err(ApiError::Validation)?;
            }
        }

        Ok(ApiResponse {
            data,
            status: response.status,
            headers: response.headers,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Content type first, then client defaults, then per-request headers
    fn merged_headers(
        &self,
        content_type: Option<&str>,
        overrides: &BTreeMap<String, String>,
    ) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        if let Some(content_type) = content_type {
            headers.insert("Content-Type".to_string(), content_type.to_string());
        }
        headers.extend(self.config.headers.clone());
        headers.extend(overrides.clone());
        headers
    }
}
