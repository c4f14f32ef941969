//! frontkit
//!
//! Conveniences for front-end style applications: a caching JSON HTTP
//! client, UI hooks expressed as plain values, and performance helpers.
//! Every platform service they rely on is injected through the traits in
//! [`platform`], so each piece also works (as a no-op where appropriate)
//! without that service.

pub mod api;
pub mod cli;
pub mod config;
pub mod hooks;
pub mod perf;
pub mod platform;
