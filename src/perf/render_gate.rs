//! Selective re-render gating
//!
//! A [`RenderGate`] decides whether a component must re-render by comparing a
//! chosen subset of its props. Props are any `Serialize` type; a prop is a
//! top-level field of the serialized value.

use serde::Serialize;
use serde_json::Value;

/// Options for [`memoize_component`]
#[derive(Debug, Clone, Default)]
pub struct MemoizeOptions {
    /// Props whose change triggers a re-render; `None` re-renders every time
    pub props_to_watch: Option<Vec<String>>,
}

/// Compares watched props between renders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderGate {
    watched: Option<Vec<String>>,
}

impl RenderGate {
    /// A gate without a watch list; it never skips a render
    pub fn new() -> Self {
        Self::default()
    }

    /// A gate that skips renders while all of `props` are unchanged
    pub fn watching<I, S>(props: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            watched: Some(props.into_iter().map(Into::into).collect()),
        }
    }

    /// Watched prop names, if any
    pub fn watched(&self) -> Option<&[String]> {
        self.watched.as_deref()
    }

    /// Whether `prev` and `next` are equal for rendering purposes
    ///
    /// Returns `true` (skip the render) only when a watch list exists and every
    /// watched prop is equal. A prop missing from both sides counts as equal.
    /// Props that fail to serialize are treated as changed.
    pub fn props_equal<P: Serialize + ?Sized>(&self, prev: &P, next: &P) -> bool {
        let Some(watched) = &self.watched else {
            return false;
        };

        let (prev, next) = match (serde_json::to_value(prev), serde_json::to_value(next)) {
            (Ok(prev), Ok(next)) => (prev, next),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Failed to serialize props, rendering");
                return false;
            }
        };

        watched
            .iter()
            .all(|name| prop(&prev, name) == prop(&next, name))
    }

    /// Whether a render is needed when props go from `prev` to `next`
    pub fn should_render<P: Serialize + ?Sized>(&self, prev: &P, next: &P) -> bool {
        !self.props_equal(prev, next)
    }
}

fn prop<'a>(props: &'a Value, name: &str) -> &'a Value {
    props.get(name).unwrap_or(&Value::Null)
}

/// Something that renders props into output
pub trait Component {
    type Props: Serialize + Clone;
    type Output: Clone;

    fn render(&mut self, props: &Self::Props) -> Self::Output;
}

/// A component whose renders are gated by a [`RenderGate`]
pub struct Memoized<C: Component> {
    component: C,
    gate: RenderGate,
    last: Option<(C::Props, C::Output)>,
}

impl<C: Component> Memoized<C> {
    /// Wraps `component` behind `gate`
    pub fn new(component: C, gate: RenderGate) -> Self {
        Self {
            component,
            gate,
            last: None,
        }
    }

    /// Renders `props`, reusing the previous output when the gate allows
    pub fn render(&mut self, props: C::Props) -> C::Output {
        if let Some((prev_props, prev_output)) = &self.last {
            if self.gate.props_equal(prev_props, &props) {
                return prev_output.clone();
            }
        }

        let output = self.component.render(&props);
        self.last = Some((props, output.clone()));
        output
    }

    /// The wrapped component
    pub fn inner(&self) -> &C {
        &self.component
    }
}

/// Wraps `component` so it only re-renders when watched props change
pub fn memoize_component<C: Component>(component: C, options: MemoizeOptions) -> Memoized<C> {
    let gate = match options.props_to_watch {
        Some(props) => RenderGate::watching(props),
        None => RenderGate::new(),
    };
    Memoized::new(component, gate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    struct CardProps {
        title: String,
        count: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        subtitle: Option<String>,
    }

    fn props(title: &str, count: u32) -> CardProps {
        CardProps {
            title: title.to_string(),
            count,
            subtitle: None,
        }
    }

    /// Counts how often it actually renders
    #[derive(Default)]
    struct Card {
        renders: usize,
    }

    impl Component for Card {
        type Props = CardProps;
        type Output = String;

        fn render(&mut self, props: &CardProps) -> String {
            self.renders += 1;
            format!("{} ({})", props.title, props.count)
        }
    }

    #[test]
    fn test_no_watch_list_always_renders() {
        let gate = RenderGate::new();
        let p = props("a", 1);
        assert!(!gate.props_equal(&p, &p));
        assert!(gate.should_render(&p, &p));
    }

    #[test]
    fn test_watched_props_unchanged_skips() {
        let gate = RenderGate::watching(["title"]);
        assert!(gate.props_equal(&props("a", 1), &props("a", 2)));
    }

    #[test]
    fn test_watched_prop_changed_renders() {
        let gate = RenderGate::watching(["title", "count"]);
        assert!(gate.should_render(&props("a", 1), &props("a", 2)));
    }

    #[test]
    fn test_missing_prop_on_both_sides_is_equal() {
        let gate = RenderGate::watching(["subtitle"]);
        assert!(gate.props_equal(&props("a", 1), &props("b", 2)));

        let mut with_subtitle = props("a", 1);
        with_subtitle.subtitle = Some("s".to_string());
        assert!(gate.should_render(&props("a", 1), &with_subtitle));
    }

    #[test]
    fn test_empty_watch_list_always_skips() {
        let gate = RenderGate::watching(Vec::<String>::new());
        assert!(gate.props_equal(&props("a", 1), &props("b", 2)));
    }

    #[test]
    fn test_memoized_reuses_output() {
        let options = MemoizeOptions {
            props_to_watch: Some(vec!["title".to_string()]),
        };
        let mut card = memoize_component(Card::default(), options);

        assert_eq!(card.render(props("a", 1)), "a (1)");
        assert_eq!(card.render(props("a", 2)), "a (1)", "Count is not watched");
        assert_eq!(card.render(props("b", 3)), "b (3)");
        assert_eq!(card.inner().renders, 2);
    }

    #[test]
    fn test_memoized_without_watch_list_renders_every_time() {
        let mut card = memoize_component(Card::default(), MemoizeOptions::default());

        card.render(props("a", 1));
        card.render(props("a", 1));

        assert_eq!(card.inner().renders, 2);
    }
}
