//! Performance helpers
//!
//! - [`RenderGate`] / [`memoize_component`] skip renders when watched props are unchanged
//! - [`prefetch_resources`] warms resources ahead of use
//! - [`PerformanceMonitor`] aggregates measured durations

mod monitor;
mod prefetch;
mod render_gate;

pub use monitor::{Measurement, MetricsSummary, PerformanceMonitor, DEFAULT_SAMPLE_WINDOW};
pub use prefetch::{prefetch_resources, HttpPrefetcher, PrefetchError, ResourceHints};
pub use render_gate::{memoize_component, Component, MemoizeOptions, Memoized, RenderGate};
