//! Fetch-style transport used by the API client
//!
//! The client never talks to the network directly; it hands a
//! [`TransportRequest`] to a [`Transport`] and interprets the returned
//! [`TransportResponse`]. [`ReqwestTransport`] is the native implementation.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::error::ApiError;

/// HTTP methods supported by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Returns the method name as sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single outgoing request
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

/// A response as received from the transport
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Reason phrase for the status
    pub status_text: String,
    /// Response headers (lowercase names)
    pub headers: BTreeMap<String, String>,
    /// Raw response body
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Whether the status is in the 2xx range
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Issues HTTP requests on behalf of the API client
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and returns the response, whatever its status
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, ApiError>;
}

/// Transport backed by a [`reqwest::Client`]
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a new transport with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new transport with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, ApiError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = settle_body(status, response.bytes().await.map(|b| b.to_vec()))?;

        Ok(TransportResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

/// Resolves the body read of a response with status `status`
///
/// A failed read of an error response yields an empty body so that the
/// status error still reaches the caller; a failed read of a success response
/// is returned as is.
fn settle_body<E: fmt::Display>(
    status: reqwest::StatusCode,
    read: Result<Vec<u8>, E>,
) -> Result<Vec<u8>, E> {
    match read {
        Ok(body) => Ok(body),
        Err(e) if !status.is_success() => {
            tracing::warn!(status = status.as_u16(), error = %e, "Failed to read error body");
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}
