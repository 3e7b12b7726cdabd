//! Snapshot-to-state classification with hit-count bias.
//!
//! A state matches a frame iff every one of its conditions evaluates through
//! the [`Perception`] port at its declared polarity; evaluation is lazy and
//! short-circuits on the first failing condition. The hit-count table only
//! biases search order toward recently seen states, never correctness: a
//! frame satisfying exactly one state classifies as that state no matter the
//! counts.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::core::graph::{State, StateGraph};
use crate::core::types::Rect;
use crate::error::{Error, Result};
use crate::io::ports::{Frame, Perception};

/// A winning match: the state id plus the bounding rectangles of its
/// positively matched conditions (observability only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub state: String,
    pub regions: Vec<Rect>,
}

/// Maps frames to state ids, owned by a single engine instance.
#[derive(Debug, Default)]
pub struct Classifier {
    hits: HashMap<String, u64>,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Times `state` has previously been the winning match.
    pub fn hits(&self, state: &str) -> u64 {
        self.hits.get(state).copied().unwrap_or(0)
    }

    /// Classify a frame. The hint's conditions are checked first; remaining
    /// states follow in descending hit-count order, ties in authored order.
    ///
    /// `Ok(None)` means no configured state matches: a retryable outcome that
    /// drives another poll, not an error.
    pub fn classify<P: Perception>(
        &mut self,
        graph: &StateGraph,
        perception: &P,
        frame: &Frame,
        hint: Option<&str>,
    ) -> Result<Option<Classification>> {
        if let Some(hinted) = hint {
            if let Ok(state) = graph.state(hinted) {
                if let Some(regions) = evaluate(perception, state, frame)? {
                    return Ok(Some(self.record(state.name.clone(), regions)));
                }
            }
        }

        let mut order: Vec<&State> = graph.all_states().iter().collect();
        // Stable sort keeps authored order among equal hit counts.
        order.sort_by(|a, b| self.hits(&b.name).cmp(&self.hits(&a.name)));
        for state in order {
            if hint == Some(state.name.as_str()) {
                continue;
            }
            if let Some(regions) = evaluate(perception, state, frame)? {
                return Ok(Some(self.record(state.name.clone(), regions)));
            }
        }

        trace!("no state matched the frame");
        Ok(None)
    }

    fn record(&mut self, state: String, regions: Vec<Rect>) -> Classification {
        *self.hits.entry(state.clone()).or_insert(0) += 1;
        debug!(state = %state, hits = self.hits[&state], "frame classified");
        Classification { state, regions }
    }
}

/// Evaluate a state's conditions against the frame. `Some(regions)` on a full
/// match; `None` on the first failing condition or when the state has none.
fn evaluate<P: Perception>(
    perception: &P,
    state: &State,
    frame: &Frame,
) -> Result<Option<Vec<Rect>>> {
    if state.conditions.is_empty() {
        return Ok(None);
    }
    let mut regions = Vec::new();
    for condition in &state.conditions {
        let area = perception
            .match_area(&condition.reference, frame)
            .map_err(Error::Port)?;
        match (condition.negated, area) {
            (false, Some(rect)) => regions.push(rect),
            (true, None) => {}
            _ => return Ok(None),
        }
    }
    Ok(Some(regions))
}

#[cfg(test)]
mod tests {
    use super::Classifier;
    use crate::core::graph::{GraphBuilder, State, StateGraph};
    use crate::core::types::{Condition, Rect, StateKind};
    use crate::test_support::{ScriptedPerception, frame};

    fn graph(entries: &[(&str, &str)]) -> StateGraph {
        let mut builder = GraphBuilder::new("test");
        for (name, condition) in entries {
            builder.add_state(State {
                name: name.to_string(),
                kind: StateKind::Normal,
                conditions: Condition::parse_list(condition),
            });
        }
        builder.build().expect("build")
    }

    #[test]
    fn single_matching_state_wins_regardless_of_bias() {
        let graph = graph(&[("home", "home_marker"), ("shop", "shop_marker")]);
        let snap = frame("shop_screen");
        let perception =
            ScriptedPerception::new().with_match("shop_marker", &snap, Rect::new(0, 0, 10, 10));

        let mut classifier = Classifier::new();
        // Warm the table in favor of the wrong state.
        let home_snap = frame("home_screen");
        let perception_home = ScriptedPerception::new().with_match(
            "home_marker",
            &home_snap,
            Rect::new(0, 0, 5, 5),
        );
        for _ in 0..5 {
            let hit = classifier
                .classify(&graph, &perception_home, &home_snap, None)
                .expect("classify");
            assert_eq!(hit.expect("match").state, "home");
        }

        let hit = classifier
            .classify(&graph, &perception, &snap, None)
            .expect("classify")
            .expect("match");
        assert_eq!(hit.state, "shop");
        assert_eq!(hit.regions, vec![Rect::new(0, 0, 10, 10)]);
    }

    #[test]
    fn no_matching_state_returns_none() {
        let graph = graph(&[("home", "home_marker")]);
        let snap = frame("unknown_screen");
        let perception = ScriptedPerception::new();

        let mut classifier = Classifier::new();
        let hit = classifier
            .classify(&graph, &perception, &snap, None)
            .expect("classify");
        assert!(hit.is_none());
    }

    #[test]
    fn classify_is_idempotent_on_unchanged_frame() {
        let graph = graph(&[("home", "home_marker"), ("shop", "shop_marker")]);
        let snap = frame("home_screen");
        let perception =
            ScriptedPerception::new().with_match("home_marker", &snap, Rect::new(1, 2, 3, 4));

        let mut classifier = Classifier::new();
        let first = classifier
            .classify(&graph, &perception, &snap, None)
            .expect("classify")
            .expect("match");
        let second = classifier
            .classify(&graph, &perception, &snap, None)
            .expect("classify")
            .expect("match");
        assert_eq!(first.state, second.state);
        assert_eq!(classifier.hits("home"), 2);
    }

    #[test]
    fn negated_condition_blocks_when_reference_present() {
        let graph = graph(&[("clean", "header|!popup_banner")]);
        let snap = frame("with_popup");
        let perception = ScriptedPerception::new()
            .with_match("header", &snap, Rect::new(0, 0, 1, 1))
            .with_match("popup_banner", &snap, Rect::new(5, 5, 9, 9));

        let mut classifier = Classifier::new();
        let hit = classifier
            .classify(&graph, &perception, &snap, None)
            .expect("classify");
        assert!(hit.is_none());
    }

    #[test]
    fn hint_is_checked_before_biased_order() {
        // Both states match the frame; the hint decides.
        let graph = graph(&[("a", "shared_marker"), ("b", "shared_marker")]);
        let snap = frame("ambiguous");
        let perception =
            ScriptedPerception::new().with_match("shared_marker", &snap, Rect::new(0, 0, 2, 2));

        let mut classifier = Classifier::new();
        let hit = classifier
            .classify(&graph, &perception, &snap, Some("b"))
            .expect("classify")
            .expect("match");
        assert_eq!(hit.state, "b");
    }

    #[test]
    fn higher_hit_count_is_checked_first_on_ambiguity() {
        let graph = graph(&[("a", "shared_marker"), ("b", "shared_marker")]);
        let snap = frame("ambiguous");
        let perception =
            ScriptedPerception::new().with_match("shared_marker", &snap, Rect::new(0, 0, 2, 2));

        let mut classifier = Classifier::new();
        for _ in 0..3 {
            classifier
                .classify(&graph, &perception, &snap, Some("b"))
                .expect("classify");
        }
        let hit = classifier
            .classify(&graph, &perception, &snap, None)
            .expect("classify")
            .expect("match");
        assert_eq!(hit.state, "b");
    }

    #[test]
    fn empty_condition_state_never_classifies() {
        let graph = graph(&[("blank", "")]);
        let snap = frame("anything");
        let perception = ScriptedPerception::new();

        let mut classifier = Classifier::new();
        let hit = classifier
            .classify(&graph, &perception, &snap, Some("blank"))
            .expect("classify");
        assert!(hit.is_none());
    }
}
