//! Shared value types for states, actions, and driving targets.
//!
//! These types define stable contracts between the graph, the planner, the
//! classifier, and the engine. They carry no behavior beyond parsing and
//! small exhaustively-matched helpers.

use serde::{Deserialize, Serialize};

/// Reserved planning-target id. Never a user-authored state name; an action
/// whose successor names it routes to the "classify whatever comes next"
/// sentinel node.
pub const IDENTIFY_STATE: &str = "need_identify";

/// How a state presents its actions on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    /// Stable screen; action targets are directly visible.
    Normal,
    /// Transient/interstitial screen (unskippable animation, loading) that
    /// resolves to a direct state given enough polling.
    Jump,
    /// Action targets are found by scrolling horizontally.
    HorizontalSwipe,
    /// Action targets are found by scrolling vertically.
    VerticalSwipe,
}

impl StateKind {
    /// Direct states are stable classification targets; `Jump` is the one
    /// interstitial kind and triggers recovery when met unexpectedly.
    pub fn is_direct(self) -> bool {
        !matches!(self, StateKind::Jump)
    }
}

/// Interaction primitive an action uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Click,
    Swipe,
}

/// Cardinal swipe direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Up,
    Right,
    Down,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

/// Axis-aligned match rectangle in device coordinates (inclusive bounds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Rect {
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }
}

/// A single match condition: a reference-image id, optionally negated.
///
/// A negated condition holds only when the reference is *absent* from the
/// snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub reference: String,
    pub negated: bool,
}

impl Condition {
    /// Parse one authored condition token; a leading `!` negates.
    pub fn parse(token: &str) -> Self {
        match token.strip_prefix('!') {
            Some(reference) => Self {
                reference: reference.to_string(),
                negated: true,
            },
            None => Self {
                reference: token.to_string(),
                negated: false,
            },
        }
    }

    /// Parse a `'|'`-joined condition list. Empty input yields no conditions
    /// (such a state can never classify).
    pub fn parse_list(joined: &str) -> Vec<Self> {
        if joined.is_empty() {
            return Vec::new();
        }
        joined.split('|').map(Self::parse).collect()
    }
}

/// What a drive request steers toward: a named state, or the sentinel that
/// accepts any successful classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    State(String),
    Identify,
}

impl Target {
    /// Graph node the planner routes toward.
    pub fn node_id(&self) -> &str {
        match self {
            Target::State(id) => id,
            Target::Identify => IDENTIFY_STATE,
        }
    }

    /// Classification hint for verification polls.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Target::State(id) => Some(id),
            Target::Identify => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Condition, Direction, StateKind};

    #[test]
    fn parse_list_splits_and_negates() {
        let conditions = Condition::parse_list("header|!popup_banner");
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].reference, "header");
        assert!(!conditions[0].negated);
        assert_eq!(conditions[1].reference, "popup_banner");
        assert!(conditions[1].negated);
    }

    #[test]
    fn parse_list_empty_has_no_conditions() {
        assert!(Condition::parse_list("").is_empty());
    }

    #[test]
    fn jump_is_the_only_indirect_kind() {
        assert!(StateKind::Normal.is_direct());
        assert!(StateKind::HorizontalSwipe.is_direct());
        assert!(StateKind::VerticalSwipe.is_direct());
        assert!(!StateKind::Jump.is_direct());
    }

    #[test]
    fn opposite_directions_pair_up() {
        assert_eq!(Direction::Right.opposite(), Direction::Left);
        assert_eq!(Direction::Down.opposite(), Direction::Up);
    }
}
