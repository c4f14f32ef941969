//! # API Client
//!
//! HTTP client for JSON APIs with optional in-memory caching of GET
//! responses.
//!
//! This module provides the [`ApiClient`] plus the [`Transport`] seam it
//! sends requests through.

mod cache;
mod client;
mod error;
mod transport;

pub use cache::{CachedData, ResponseCache, DEFAULT_CACHE_DURATION};
pub use client::{ApiClient, ApiResponse, GetOptions, RequestOptions, ResponseValidator};
pub use error::{ApiError, ApiResult};
pub use transport::{Method, ReqwestTransport, Transport, TransportRequest, TransportResponse};
