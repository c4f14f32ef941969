//! Element visibility tracking
//!
//! [`VisibilityTracker`] follows whether one element intersects its root (an
//! explicit root element, or the viewport) according to an
//! [`IntersectionObserver`]. The tracker owns the observer registration: it is
//! established when an element is attached and released on detach, on a
//! configuration change, and on drop.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

/// Identifies an element known to the observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

/// Identifies one observer registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObservationId(pub u64);

/// Errors that can occur when configuring observation
#[derive(Debug, Error, PartialEq)]
pub enum VisibilityError {
    /// Root margin is not a 1-4 value list of `px` or `%` lengths
    #[error("Invalid root margin '{0}': expected 1 to 4 lengths in px or %")]
    InvalidRootMargin(String),

    /// Threshold ratio is outside `0.0..=1.0`
    #[error("Threshold {0} must be between 0.0 and 1.0")]
    InvalidThreshold(f64),
}

/// Visible fraction(s) of the target at which observers are notified
#[derive(Debug, Clone, PartialEq)]
pub enum Threshold {
    Ratio(f64),
    Ratios(Vec<f64>),
}

impl Default for Threshold {
    fn default() -> Self {
        Threshold::Ratio(0.0)
    }
}

impl From<f64> for Threshold {
    fn from(ratio: f64) -> Self {
        Threshold::Ratio(ratio)
    }
}

impl From<Vec<f64>> for Threshold {
    fn from(ratios: Vec<f64>) -> Self {
        Threshold::Ratios(ratios)
    }
}

impl Threshold {
    /// Returns the ratios sorted ascending without duplicates
    ///
    /// An empty list behaves like a single `0.0` threshold.
    pub fn ratios(&self) -> Result<Vec<f64>, VisibilityError> {
        let mut ratios = match self {
            Threshold::Ratio(r) => vec![*r],
            Threshold::Ratios(rs) if rs.is_empty() => vec![0.0],
            Threshold::Ratios(rs) => rs.clone(),
        };

        if let Some(bad) = ratios.iter().find(|r| !(0.0..=1.0).contains(*r)) {
            return Err(VisibilityError::InvalidThreshold(*bad));
        }

        ratios.sort_by(f64::total_cmp);
        ratios.dedup();
        Ok(ratios)
    }
}

/// A single margin length
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarginLength {
    Px(f64),
    /// Percentage of the root's width (left/right) or height (top/bottom)
    Percent(f64),
}

impl MarginLength {
    /// Resolves the length against the relevant root dimension
    pub fn resolve(&self, basis: f64) -> f64 {
        match self {
            MarginLength::Px(px) => *px,
            MarginLength::Percent(pct) => basis * pct / 100.0,
        }
    }

    fn parse(token: &str) -> Option<Self> {
        if let Some(px) = token.strip_suffix("px") {
            return px.parse().ok().map(MarginLength::Px);
        }
        if let Some(pct) = token.strip_suffix('%') {
            return pct.parse().ok().map(MarginLength::Percent);
        }
        // Unitless zero is the only bare number CSS accepts
        match token.parse::<f64>() {
            Ok(v) if v == 0.0 => Some(MarginLength::Px(0.0)),
            _ => None,
        }
    }
}

/// Margin grown around the root before computing intersections
///
/// Parsed from CSS margin shorthand: `"10px"`, `"10px 5%"`,
/// `"1px 2px 3px"` or `"1px 2px 3px 4px"` (top, right, bottom, left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootMargin {
    pub top: MarginLength,
    pub right: MarginLength,
    pub bottom: MarginLength,
    pub left: MarginLength,
}

impl Default for RootMargin {
    fn default() -> Self {
        let zero = MarginLength::Px(0.0);
        Self {
            top: zero,
            right: zero,
            bottom: zero,
            left: zero,
        }
    }
}

impl FromStr for RootMargin {
    type Err = VisibilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VisibilityError::InvalidRootMargin(s.to_string());

        let lengths = s
            .split_whitespace()
            .map(MarginLength::parse)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(invalid)?;

        let (top, right, bottom, left) = match lengths.as_slice() {
            [] => return Ok(RootMargin::default()),
            [all] => (*all, *all, *all, *all),
            [vertical, horizontal] => (*vertical, *horizontal, *vertical, *horizontal),
            [top, horizontal, bottom] => (*top, *horizontal, *bottom, *horizontal),
            [top, right, bottom, left] => (*top, *right, *bottom, *left),
            _ => return Err(invalid()),
        };

        Ok(RootMargin {
            top,
            right,
            bottom,
            left,
        })
    }
}

/// Observation configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ObserverOptions {
    pub threshold: Threshold,
    /// CSS margin shorthand applied around the root
    pub root_margin: String,
    /// Element whose box is the root; `None` observes against the viewport
    pub root: Option<ElementId>,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            threshold: Threshold::default(),
            root_margin: "0px".to_string(),
            root: None,
        }
    }
}

impl ObserverOptions {
    /// Sets the threshold(s)
    pub fn with_threshold(mut self, threshold: impl Into<Threshold>) -> Self {
        self.threshold = threshold.into();
        self
    }

    /// Sets the root margin
    pub fn with_root_margin(mut self, root_margin: impl Into<String>) -> Self {
        self.root_margin = root_margin.into();
        self
    }

    /// Sets an explicit root element
    pub fn with_root(mut self, root: ElementId) -> Self {
        self.root = Some(root);
        self
    }
}

/// A change in a target's intersection with its root
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub target: ElementId,
    pub is_intersecting: bool,
    pub intersection_ratio: f64,
}

/// Callback invoked with every intersection change
pub type IntersectionCallback = Arc<dyn Fn(&IntersectionEntry) + Send + Sync>;

/// Platform intersection-observation primitive
pub trait IntersectionObserver: Send + Sync {
    /// Starts reporting intersection changes of `target` to `callback`
    fn observe(
        &self,
        target: ElementId,
        options: &ObserverOptions,
        callback: IntersectionCallback,
    ) -> Result<ObservationId, VisibilityError>;

    /// Stops a registration; unknown ids are ignored
    fn unobserve(&self, id: ObservationId);
}

/// Tracks whether an attached element is currently visible
///
/// Without an observer capability every operation is a no-op and the
/// element is never reported visible.
pub struct VisibilityTracker {
    options: ObserverOptions,
    observer: Option<Arc<dyn IntersectionObserver>>,
    target: Option<ElementId>,
    registration: Option<ObservationId>,
    visible: Arc<AtomicBool>,
}

impl fmt::Debug for VisibilityTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisibilityTracker")
            .field("options", &self.options)
            .field("target", &self.target)
            .field("registration", &self.registration)
            .field("visible", &self.is_visible())
            .finish()
    }
}

impl VisibilityTracker {
    /// Creates a tracker with nothing attached
    pub fn new(options: ObserverOptions, observer: Option<Arc<dyn IntersectionObserver>>) -> Self {
        Self {
            options,
            observer,
            target: None,
            registration: None,
            visible: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Attaches the tracker to `target` and starts observing it
    ///
    /// Any previous registration is released first.
    pub fn attach(&mut self, target: ElementId) -> Result<(), VisibilityError> {
        self.release();
        self.target = Some(target);
        self.observe()
    }

    /// Stops observing and forgets the attached element
    pub fn detach(&mut self) {
        self.release();
        self.target = None;
    }

    /// Applies new options, re-registering if threshold, root or margin changed
    pub fn set_options(&mut self, options: ObserverOptions) -> Result<(), VisibilityError> {
        if options == self.options {
            return Ok(());
        }
        self.release();
        self.options = options;
        self.observe()
    }

    /// Whether the attached element was intersecting at the last notification
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    /// Currently attached element
    pub fn target(&self) -> Option<ElementId> {
        self.target
    }

    /// Current options
    pub fn options(&self) -> &ObserverOptions {
        &self.options
    }

    /// Whether a registration with the observer is active
    pub fn is_observing(&self) -> bool {
        self.registration.is_some()
    }

    fn observe(&mut self) -> Result<(), VisibilityError> {
        let (Some(observer), Some(target)) = (&self.observer, self.target) else {
            return Ok(());
        };

        let visible = Arc::clone(&self.visible);
        let callback: IntersectionCallback = Arc::new(move |entry: &IntersectionEntry| {
            visible.store(entry.is_intersecting, Ordering::Release);
        });

        self.registration = Some(observer.observe(target, &self.options, callback)?);
        Ok(())
    }

    fn release(&mut self) {
        if let (Some(observer), Some(id)) = (&self.observer, self.registration.take()) {
            observer.unobserve(id);
        }
    }
}

impl Drop for VisibilityTracker {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::layout::{LayoutObserver, Rect};

    fn viewport() -> Rect {
        Rect::new(0.0, 0.0, 100.0, 100.0)
    }

    fn layout_with_target(rect: Rect) -> Arc<LayoutObserver> {
        let layout = Arc::new(LayoutObserver::new(viewport()));
        layout.set_rect(ElementId(1), rect);
        layout
    }

    #[test]
    fn test_threshold_ratios_sorted_and_deduped() {
        let threshold = Threshold::Ratios(vec![1.0, 0.25, 0.5, 0.25]);
        assert_eq!(threshold.ratios().unwrap(), vec![0.25, 0.5, 1.0]);
        assert_eq!(Threshold::Ratios(vec![]).ratios().unwrap(), vec![0.0]);
        assert_eq!(Threshold::from(0.3).ratios().unwrap(), vec![0.3]);
    }

    #[test]
    fn test_threshold_out_of_range() {
        assert_eq!(
            Threshold::Ratio(1.5).ratios(),
            Err(VisibilityError::InvalidThreshold(1.5))
        );
        assert!(Threshold::Ratios(vec![0.0, -0.1]).ratios().is_err());
    }

    #[test]
    fn test_root_margin_shorthand() {
        let one: RootMargin = "10px".parse().unwrap();
        assert_eq!(one.top, MarginLength::Px(10.0));
        assert_eq!(one.left, MarginLength::Px(10.0));

        let two: RootMargin = "10px 5%".parse().unwrap();
        assert_eq!(two.top, MarginLength::Px(10.0));
        assert_eq!(two.bottom, MarginLength::Px(10.0));
        assert_eq!(two.right, MarginLength::Percent(5.0));
        assert_eq!(two.left, MarginLength::Percent(5.0));

        let three: RootMargin = "1px 2px 3px".parse().unwrap();
        assert_eq!(three.top, MarginLength::Px(1.0));
        assert_eq!(three.right, MarginLength::Px(2.0));
        assert_eq!(three.bottom, MarginLength::Px(3.0));
        assert_eq!(three.left, MarginLength::Px(2.0));

        let four: RootMargin = "1px 2px 3px -4px".parse().unwrap();
        assert_eq!(four.left, MarginLength::Px(-4.0));

        let zero: RootMargin = "0".parse().unwrap();
        assert_eq!(zero, RootMargin::default());
    }

    #[test]
    fn test_root_margin_invalid() {
        assert!("10em".parse::<RootMargin>().is_err());
        assert!("5".parse::<RootMargin>().is_err());
        assert!("1px 2px 3px 4px 5px".parse::<RootMargin>().is_err());
    }

    #[test]
    fn test_margin_percent_resolves_against_basis() {
        assert_eq!(MarginLength::Percent(10.0).resolve(200.0), 20.0);
        assert_eq!(MarginLength::Px(7.0).resolve(200.0), 7.0);
    }

    #[test]
    fn test_attach_reports_initial_visibility() {
        let layout = layout_with_target(Rect::new(10.0, 10.0, 20.0, 20.0));
        let mut tracker = VisibilityTracker::new(ObserverOptions::default(), Some(layout.clone()));

        assert!(!tracker.is_visible());
        tracker.attach(ElementId(1)).unwrap();

        assert!(tracker.is_visible());
        assert!(tracker.is_observing());
        assert_eq!(layout.observation_count(), 1);
    }

    #[test]
    fn test_visibility_follows_layout_changes() {
        let layout = layout_with_target(Rect::new(10.0, 10.0, 20.0, 20.0));
        let mut tracker = VisibilityTracker::new(ObserverOptions::default(), Some(layout.clone()));
        tracker.attach(ElementId(1)).unwrap();

        // Scrolled out of view
        layout.set_rect(ElementId(1), Rect::new(10.0, 300.0, 20.0, 20.0));
        assert!(!tracker.is_visible());

        // Back in view
        layout.set_rect(ElementId(1), Rect::new(10.0, 90.0, 20.0, 20.0));
        assert!(tracker.is_visible());
    }

    #[test]
    fn test_option_change_reregisters() {
        let layout = layout_with_target(Rect::new(0.0, 110.0, 10.0, 10.0));
        let mut tracker = VisibilityTracker::new(ObserverOptions::default(), Some(layout.clone()));
        tracker.attach(ElementId(1)).unwrap();
        assert!(!tracker.is_visible());

        tracker
            .set_options(ObserverOptions::default().with_root_margin("20px"))
            .unwrap();

        assert!(tracker.is_visible(), "Grown root margin brings target into view");
        assert_eq!(layout.observation_count(), 1, "Old registration released");
    }

    #[test]
    fn test_unchanged_options_keep_registration() {
        let layout = layout_with_target(Rect::new(0.0, 0.0, 10.0, 10.0));
        let mut tracker = VisibilityTracker::new(ObserverOptions::default(), Some(layout.clone()));
        tracker.attach(ElementId(1)).unwrap();
        let before = tracker.registration;

        tracker.set_options(ObserverOptions::default()).unwrap();

        assert_eq!(tracker.registration, before);
    }

    #[test]
    fn test_invalid_options_surface_error() {
        let layout = layout_with_target(Rect::new(0.0, 0.0, 10.0, 10.0));
        let mut tracker = VisibilityTracker::new(
            ObserverOptions::default().with_root_margin("wide"),
            Some(layout.clone()),
        );

        let err = tracker.attach(ElementId(1)).unwrap_err();

        assert!(matches!(err, VisibilityError::InvalidRootMargin(_)));
        assert!(!tracker.is_observing());
        assert_eq!(layout.observation_count(), 0);
    }

    #[test]
    fn test_drop_releases_registration() {
        let layout = layout_with_target(Rect::new(0.0, 0.0, 10.0, 10.0));
        {
            let mut tracker =
                VisibilityTracker::new(ObserverOptions::default(), Some(layout.clone()));
            tracker.attach(ElementId(1)).unwrap();
            assert_eq!(layout.observation_count(), 1);
        }
        assert_eq!(layout.observation_count(), 0);
    }

    #[test]
    fn test_detach_releases_registration() {
        let layout = layout_with_target(Rect::new(0.0, 0.0, 10.0, 10.0));
        let mut tracker = VisibilityTracker::new(ObserverOptions::default(), Some(layout.clone()));
        tracker.attach(ElementId(1)).unwrap();

        tracker.detach();

        assert!(tracker.target().is_none());
        assert!(!tracker.is_observing());
        assert_eq!(layout.observation_count(), 0);
    }

    #[test]
    fn test_without_observer_is_noop() {
        let mut tracker = VisibilityTracker::new(ObserverOptions::default(), None);

        tracker.attach(ElementId(1)).unwrap();
        tracker
            .set_options(ObserverOptions::default().with_threshold(0.5))
            .unwrap();

        assert_eq!(tracker.target(), Some(ElementId(1)));
        assert!(!tracker.is_observing());
        assert!(!tracker.is_visible());
    }
}
