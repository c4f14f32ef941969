//! Duration measurement aggregator
//!
//! A [`PerformanceMonitor`] collects named duration samples and summarizes
//! them. Statistics are kept as running aggregates so they cover every sample
//! ever recorded, while only a fixed window of the most recent raw samples is
//! retained.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde::Serialize;

use crate::platform::{Clock, MonotonicClock};

/// Number of raw samples kept per label by default
pub const DEFAULT_SAMPLE_WINDOW: usize = 1024;

static GLOBAL: OnceCell<PerformanceMonitor> = OnceCell::new();

/// Summary statistics over all samples of a label
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub count: u64,
}

/// Rolling statistics for one label
#[derive(Debug, Clone)]
struct MetricsSeries {
    count: u64,
    total: f64,
    min: f64,
    max: f64,
    recent: VecDeque<f64>,
}

impl MetricsSeries {
    fn new() -> Self {
        Self {
            count: 0,
            total: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            recent: VecDeque::new(),
        }
    }

    fn push(&mut self, duration_ms: f64, window: usize) {
        self.count += 1;
        self.total += duration_ms;
        self.min = self.min.min(duration_ms);
        self.max = self.max.max(duration_ms);

        if window > 0 {
            if self.recent.len() == window {
                self.recent.pop_front();
            }
            self.recent.push_back(duration_ms);
        }
    }

    fn summary(&self) -> Option<MetricsSummary> {
        if self.count == 0 {
            return None;
        }
        Some(MetricsSummary {
            average: self.total / self.count as f64,
            min: self.min,
            max: self.max,
            count: self.count,
        })
    }
}

type SeriesMap = Arc<Mutex<HashMap<String, MetricsSeries>>>;

/// Collects duration samples per label
///
/// Cloning is cheap; clones share the same samples. Without a clock,
/// measurements record nothing (explicit [`record`](Self::record) calls still
/// do).
#[derive(Clone)]
pub struct PerformanceMonitor {
    clock: Option<Arc<dyn Clock>>,
    series: SeriesMap,
    window: usize,
}

impl fmt::Debug for PerformanceMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerformanceMonitor")
            .field("has_clock", &self.clock.is_some())
            .field("labels", &self.series.lock().len())
            .field("window", &self.window)
            .finish()
    }
}

impl PerformanceMonitor {
    /// Creates an empty monitor timed by `clock`
    pub fn new(clock: Option<Arc<dyn Clock>>) -> Self {
        Self {
            clock,
            series: Arc::new(Mutex::new(HashMap::new())),
            window: DEFAULT_SAMPLE_WINDOW,
        }
    }

    /// Sets how many raw samples are kept per label
    pub fn with_sample_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Process-wide monitor, created on first access with a monotonic clock
    pub fn global() -> &'static PerformanceMonitor {
        GLOBAL.get_or_init(|| PerformanceMonitor::new(Some(Arc::new(MonotonicClock::new()))))
    }

    /// Starts timing `label`
    ///
    /// Any number of measurements for the same label may be open at once;
    /// each records its own duration when finished.
    pub fn start_measure(&self, label: impl Into<String>) -> Measurement {
        let start = self.clock.as_ref().map(|clock| clock.now_ms());
        Measurement {
            label: label.into(),
            start,
            monitor: self.clone(),
        }
    }

    /// Appends a sample to `label`
    pub fn record(&self, label: &str, duration_ms: f64) {
        let mut series = self.series.lock();
        series
            .entry(label.to_string())
            .or_insert_with(MetricsSeries::new)
            .push(duration_ms, self.window);
    }

    /// Returns statistics for `label`, or `None` if nothing was recorded
    pub fn get_metrics(&self, label: &str) -> Option<MetricsSummary> {
        self.series.lock().get(label)?.summary()
    }

    /// Most recent raw samples of `label`, oldest first
    pub fn samples(&self, label: &str) -> Vec<f64> {
        self.series
            .lock()
            .get(label)
            .map(|series| series.recent.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Labels with at least one sample, sorted
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.series.lock().keys().cloned().collect();
        labels.sort();
        labels
    }
}

/// An open measurement returned by [`PerformanceMonitor::start_measure`]
///
/// Dropping it without calling [`finish`](Self::finish) records nothing.
#[must_use = "a measurement records nothing until finished"]
pub struct Measurement {
    label: String,
    start: Option<f64>,
    monitor: PerformanceMonitor,
}

impl fmt::Debug for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Measurement")
            .field("label", &self.label)
            .field("start", &self.start)
            .finish()
    }
}

impl Measurement {
    /// Label being measured
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Records the elapsed time and returns it
    ///
    /// Returns `None` when the monitor has no clock.
    pub fn finish(self) -> Option<f64> {
        let start = self.start?;
        let clock = self.monitor.clock.as_ref()?;
        let duration = clock.now_ms() - start;
        self.monitor.record(&self.label, duration);
        Some(duration)
    }
}
