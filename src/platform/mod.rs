//! Platform capabilities
//!
//! Components never probe their environment. Each one takes the capability it
//! needs as an optional parameter and degrades to a no-op when it is absent.
//! [`Platform`] bundles those capabilities for hosts that want to wire them up
//! in one place.

mod clock;
mod storage;

use std::sync::Arc;

pub use clock::{Clock, ManualClock, MonotonicClock, SystemClock};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};

use crate::hooks::IntersectionObserver;
use crate::perf::{HttpPrefetcher, ResourceHints};

/// Optional platform services available to components
#[derive(Clone, Default)]
pub struct Platform {
    /// High-resolution clock for performance measurements
    pub clock: Option<Arc<dyn Clock>>,
    /// Origin-scoped key-value storage
    pub storage: Option<Arc<dyn Storage>>,
    /// Intersection observation primitive
    pub observer: Option<Arc<dyn IntersectionObserver>>,
    /// Resource prefetch mechanism
    pub hints: Option<Arc<dyn ResourceHints>>,
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform")
            .field("clock", &self.clock.is_some())
            .field("storage", &self.storage.is_some())
            .field("observer", &self.observer.is_some())
            .field("hints", &self.hints.is_some())
            .finish()
    }
}

impl Platform {
    /// No capabilities; every component behaves as a no-op
    pub fn headless() -> Self {
        Self::default()
    }

    /// Native services for `origin`: monotonic clock, file storage and HTTP
    /// prefetch
    ///
    /// Storage is absent when no data directory can be determined. There is
    /// no native intersection observer; attach one with
    /// [`with_observer`](Self::with_observer).
    pub fn native(origin: &str) -> Self {
        let storage = FileStorage::new(origin).map(|s| Arc::new(s) as Arc<dyn Storage>);
        if storage.is_none() {
            tracing::warn!(origin = %origin, "No data directory; persistent state disabled");
        }

        Self {
            clock: Some(Arc::new(MonotonicClock::new())),
            storage,
            observer: None,
            hints: Some(Arc::new(HttpPrefetcher::new())),
        }
    }

    /// Replaces the storage capability
    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Replaces the intersection observer capability
    pub fn with_observer(mut self, observer: Arc<dyn IntersectionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Replaces the clock capability
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }
}
