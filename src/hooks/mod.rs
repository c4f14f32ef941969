//! UI hooks as plain Rust values
//!
//! - [`VisibilityTracker`] follows an element's intersection with its root
//! - [`DebouncedEffect`] runs an effect once its inputs settle
//! - [`PersistentState`] keeps a value in origin storage
//!
//! [`LayoutObserver`] is a geometry-driven [`IntersectionObserver`] for hosts
//! without a browser.

mod debounce;
mod layout;
mod persistent;
mod visibility;

pub use debounce::DebouncedEffect;
pub use layout::{LayoutObserver, Rect};
pub use persistent::PersistentState;
pub use visibility::{
    ElementId, IntersectionCallback, IntersectionEntry, IntersectionObserver, MarginLength,
    ObservationId, ObserverOptions, RootMargin, Threshold, VisibilityError, VisibilityTracker,
};
