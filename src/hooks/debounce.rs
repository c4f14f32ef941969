//! Debounced side effects
//!
//! [`DebouncedEffect`] runs an effect once its inputs have been stable for a
//! delay. Every change of the dependency value or of the delay cancels the
//! pending run and starts the wait again; repeating the same dependencies
//! leaves the pending run alone.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Trailing-edge debounce over the tokio timer
///
/// Dropping the value cancels any pending run.
#[derive(Debug)]
pub struct DebouncedEffect<D> {
    runtime: Option<Handle>,
    deps: Option<D>,
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl<D: PartialEq> DebouncedEffect<D> {
    /// Creates a debouncer on the current tokio runtime, if there is one
    pub fn new() -> Self {
        Self::with_runtime(Handle::try_current().ok())
    }

    /// Creates a debouncer that schedules on `runtime`
    ///
    /// With `None`, effects are never scheduled.
    pub fn with_runtime(runtime: Option<Handle>) -> Self {
        Self {
            runtime,
            deps: None,
            delay: Duration::ZERO,
            pending: None,
        }
    }

    /// Schedules `effect` to run after `delay` unless superseded
    ///
    /// Returns `true` if a new run was scheduled, `false` if the dependencies
    /// and delay were unchanged (the earlier run stays scheduled) or no
    /// runtime is available.
    pub fn run<F>(&mut self, deps: D, delay: Duration, effect: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.deps.as_ref() == Some(&deps) && self.delay == delay {
            return false;
        }

        self.cancel();
        self.deps = Some(deps);
        self.delay = delay;

        let Some(runtime) = &self.runtime else {
            tracing::warn!("No async runtime available; debounced effect dropped");
            return false;
        };

        self.pending = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            effect();
        }));
        true
    }

    /// Cancels the pending run, if any
    ///
    /// The next [`run`](Self::run) schedules again even with the same
    /// dependencies.
    pub fn cancel(&mut self) {
        self.deps = None;
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Whether a scheduled run has not fired yet
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl<D: PartialEq> Default for DebouncedEffect<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Drop for DebouncedEffect<D> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
