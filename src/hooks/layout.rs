//! Software intersection observer
//!
//! [`LayoutObserver`] computes intersections from element rectangles supplied
//! by the host (a layout engine, a terminal UI, a test) instead of from a
//! browser. It follows the browser notification rules: an entry is delivered
//! when a target is first observed, and afterwards whenever its threshold
//! index or its intersecting state changes.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;

use super::visibility::{
    ElementId, IntersectionCallback, IntersectionEntry, IntersectionObserver, ObservationId,
    ObserverOptions, RootMargin, VisibilityError,
};

/// Axis-aligned rectangle in layout coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Overlap of two rectangles
    ///
    /// Edge-adjacent rectangles overlap in a zero-area rectangle; disjoint
    /// rectangles return `None`.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right < left || bottom < top {
            return None;
        }
        Some(Rect::new(left, top, right - left, bottom - top))
    }

    /// Grows the rectangle by a root margin (negative lengths shrink it)
    pub fn expand(&self, margin: &RootMargin) -> Rect {
        let top = margin.top.resolve(self.height);
        let right = margin.right.resolve(self.width);
        let bottom = margin.bottom.resolve(self.height);
        let left = margin.left.resolve(self.width);

        Rect::new(
            self.x - left,
            self.y - top,
            self.width + left + right,
            self.height + top + bottom,
        )
    }
}

struct Registration {
    target: ElementId,
    root: Option<ElementId>,
    margin: RootMargin,
    thresholds: Vec<f64>,
    callback: IntersectionCallback,
    /// Threshold index and intersecting state at the last notification
    last: Option<(usize, bool)>,
}

struct LayoutState {
    viewport: Rect,
    elements: HashMap<ElementId, Rect>,
    registrations: HashMap<ObservationId, Registration>,
    next_id: u64,
}

/// Intersection observer driven by explicit element geometry
pub struct LayoutObserver {
    state: Mutex<LayoutState>,
}

impl fmt::Debug for LayoutObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("LayoutObserver")
            .field("viewport", &state.viewport)
            .field("elements", &state.elements.len())
            .field("registrations", &state.registrations.len())
            .finish()
    }
}

impl LayoutObserver {
    /// Creates an observer with the given viewport and no elements
    pub fn new(viewport: Rect) -> Self {
        Self {
            state: Mutex::new(LayoutState {
                viewport,
                elements: HashMap::new(),
                registrations: HashMap::new(),
                next_id: 0,
            }),
        }
    }

    /// Resizes or scrolls the viewport
    pub fn set_viewport(&self, viewport: Rect) {
        self.state.lock().viewport = viewport;
        self.notify();
    }

    /// Places or moves an element
    pub fn set_rect(&self, element: ElementId, rect: Rect) {
        self.state.lock().elements.insert(element, rect);
        self.notify();
    }

    /// Removes an element from the layout
    pub fn remove_element(&self, element: ElementId) {
        self.state.lock().elements.remove(&element);
        self.notify();
    }

    /// Number of active registrations
    pub fn observation_count(&self) -> usize {
        self.state.lock().registrations.len()
    }

    /// Delivers entries for every registration whose state changed
    ///
    /// Callbacks run after the lock is released, so they may call back into
    /// the observer.
    fn notify(&self) {
        let pending: Vec<(IntersectionCallback, IntersectionEntry)> = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let mut pending = Vec::new();

            for registration in state.registrations.values_mut() {
                let entry = compute_entry(registration, state.viewport, &state.elements);
                let index = threshold_index(&registration.thresholds, entry.intersection_ratio);
                let current = (index, entry.is_intersecting);

                if registration.last != Some(current) {
                    registration.last = Some(current);
                    pending.push((registration.callback.clone(), entry));
                }
            }
            pending
        };

        for (callback, entry) in pending {
            callback(&entry);
        }
    }
}

impl IntersectionObserver for LayoutObserver {
    fn observe(
        &self,
        target: ElementId,
        options: &ObserverOptions,
        callback: IntersectionCallback,
    ) -> Result<ObservationId, VisibilityError> {
        let margin: RootMargin = options.root_margin.parse()?;
        let thresholds = options.threshold.ratios()?;

        let id = {
            let mut state = self.state.lock();
            let id = ObservationId(state.next_id);
            state.next_id += 1;
            state.registrations.insert(
                id,
                Registration {
                    target,
                    root: options.root,
                    margin,
                    thresholds,
                    callback,
                    last: None,
                },
            );
            id
        };

        self.notify();
        Ok(id)
    }

    fn unobserve(&self, id: ObservationId) {
        self.state.lock().registrations.remove(&id);
    }
}

fn compute_entry(
    registration: &Registration,
    viewport: Rect,
    elements: &HashMap<ElementId, Rect>,
) -> IntersectionEntry {
    let not_intersecting = IntersectionEntry {
        target: registration.target,
        is_intersecting: false,
        intersection_ratio: 0.0,
    };

    let Some(target) = elements.get(&registration.target) else {
        return not_intersecting;
    };
    let root = match registration.root {
        Some(root_id) => match elements.get(&root_id) {
            Some(rect) => *rect,
            None => return not_intersecting,
        },
        None => viewport,
    };

    let Some(overlap) = target.intersection(&root.expand(&registration.margin)) else {
        return not_intersecting;
    };

    let target_area = target.area();
    let intersection_ratio = if target_area > 0.0 {
        (overlap.area() / target_area).min(1.0)
    } else {
        1.0
    };

    IntersectionEntry {
        target: registration.target,
        is_intersecting: true,
        intersection_ratio,
    }
}

/// Index of the first threshold greater than `ratio`
fn threshold_index(thresholds: &[f64], ratio: f64) -> usize {
    thresholds
        .iter()
        .position(|t| *t > ratio)
        .unwrap_or(thresholds.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::visibility::Threshold;
    use std::sync::Arc;

    fn recorder() -> (IntersectionCallback, Arc<Mutex<Vec<IntersectionEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        let sink = entries.clone();
        let callback: IntersectionCallback = Arc::new(move |entry: &IntersectionEntry| {
            sink.lock().push(*entry);
        });
        (callback, entries)
    }

    #[test]
    fn test_rect_intersection() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(a.intersection(&b), Some(Rect::new(5.0, 5.0, 5.0, 5.0)));

        let adjacent = Rect::new(10.0, 0.0, 5.0, 5.0);
        assert_eq!(a.intersection(&adjacent).map(|r| r.area()), Some(0.0));

        let far = Rect::new(50.0, 50.0, 1.0, 1.0);
        assert!(a.intersection(&far).is_none());
    }

    #[test]
    fn test_rect_expand_with_percent() {
        let margin: RootMargin = "10% 0px".parse().unwrap();
        let expanded = Rect::new(0.0, 0.0, 100.0, 200.0).expand(&margin);
        assert_eq!(expanded, Rect::new(0.0, -20.0, 100.0, 240.0));
    }

    #[test]
    fn test_initial_notification_on_observe() {
        let layout = LayoutObserver::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        layout.set_rect(ElementId(1), Rect::new(200.0, 0.0, 10.0, 10.0));
        let (callback, entries) = recorder();

        layout
            .observe(ElementId(1), &ObserverOptions::default(), callback)
            .unwrap();

        let entries = entries.lock();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].is_intersecting);
        assert_eq!(entries[0].intersection_ratio, 0.0);
    }

    #[test]
    fn test_threshold_crossings_only() {
        let layout = LayoutObserver::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        // Fully visible
        layout.set_rect(ElementId(1), Rect::new(0.0, 0.0, 10.0, 10.0));
        let (callback, entries) = recorder();
        let options = ObserverOptions::default().with_threshold(Threshold::Ratios(vec![0.5]));
        layout.observe(ElementId(1), &options, callback).unwrap();

        // 80% visible: still above 0.5, no notification
        layout.set_rect(ElementId(1), Rect::new(92.0, 0.0, 10.0, 10.0));
        assert_eq!(entries.lock().len(), 1);

        // 30% visible: crosses 0.5
        layout.set_rect(ElementId(1), Rect::new(97.0, 0.0, 10.0, 10.0));
        let entries = entries.lock();
        assert_eq!(entries.len(), 2);
        assert!((entries[1].intersection_ratio - 0.3).abs() < 1e-9);
        assert!(entries[1].is_intersecting);
    }

    #[test]
    fn test_explicit_root_element() {
        let layout = LayoutObserver::new(Rect::new(0.0, 0.0, 1000.0, 1000.0));
        let container = ElementId(10);
        layout.set_rect(container, Rect::new(0.0, 0.0, 50.0, 50.0));
        layout.set_rect(ElementId(1), Rect::new(60.0, 0.0, 10.0, 10.0));
        let (callback, entries) = recorder();

        let options = ObserverOptions::default().with_root(container);
        layout.observe(ElementId(1), &options, callback).unwrap();
        assert!(!entries.lock()[0].is_intersecting, "Outside the container");

        // Container scrolls to include the target
        layout.set_rect(container, Rect::new(40.0, 0.0, 50.0, 50.0));
        assert!(entries.lock()[1].is_intersecting);
    }

    #[test]
    fn test_removed_target_is_not_intersecting() {
        let layout = LayoutObserver::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        layout.set_rect(ElementId(1), Rect::new(0.0, 0.0, 10.0, 10.0));
        let (callback, entries) = recorder();
        layout
            .observe(ElementId(1), &ObserverOptions::default(), callback)
            .unwrap();

        layout.remove_element(ElementId(1));

        let entries = entries.lock();
        assert_eq!(entries.len(), 2);
        assert!(!entries[1].is_intersecting);
    }

    #[test]
    fn test_unobserve_stops_notifications() {
        let layout = LayoutObserver::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        layout.set_rect(ElementId(1), Rect::new(0.0, 0.0, 10.0, 10.0));
        let (callback, entries) = recorder();
        let id = layout
            .observe(ElementId(1), &ObserverOptions::default(), callback)
            .unwrap();

        layout.unobserve(id);
        layout.set_rect(ElementId(1), Rect::new(500.0, 0.0, 10.0, 10.0));

        assert_eq!(entries.lock().len(), 1);
        assert_eq!(layout.observation_count(), 0);
    }

    #[test]
    fn test_viewport_resize_notifies() {
        let layout = LayoutObserver::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        layout.set_rect(ElementId(1), Rect::new(150.0, 0.0, 10.0, 10.0));
        let (callback, entries) = recorder();
        layout
            .observe(ElementId(1), &ObserverOptions::default(), callback)
            .unwrap();

        layout.set_viewport(Rect::new(0.0, 0.0, 200.0, 100.0));

        assert!(entries.lock()[1].is_intersecting);
    }

    #[test]
    fn test_threshold_index() {
        assert_eq!(threshold_index(&[0.0], 0.0), 1);
        assert_eq!(threshold_index(&[0.5], 0.3), 0);
        assert_eq!(threshold_index(&[0.25, 0.5, 1.0], 0.6), 2);
        assert_eq!(threshold_index(&[0.25, 0.5, 1.0], 1.0), 3);
    }
}
