//! State graph model: authored states and transitions, built once into an
//! immutable directed multigraph.
//!
//! [`GraphBuilder`] accepts states and actions in authored order with
//! idempotent, last-write-wins inserts; [`GraphBuilder::build`] validates
//! endpoint references and materializes the adjacency the planner reads.
//! A built [`StateGraph`] is read-only for the remainder of a run.

use std::collections::HashMap;

use crate::core::types::{Condition, IDENTIFY_STATE, Method, StateKind};
use crate::error::{Error, Result};

/// A perceptually identifiable condition of the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub name: String,
    pub kind: StateKind,
    /// Ordered match conditions; all must hold at their polarity for the
    /// state to classify. Empty means the state can never classify.
    pub conditions: Vec<Condition>,
}

/// A transition from one state toward another, performed by a primitive
/// interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Unique within its source state.
    pub name: String,
    pub source: String,
    pub successor: String,
    pub method: Method,
    /// Reference image used to locate the click target, or to detect
    /// swipe-search success.
    pub condition: String,
    /// When set, the action is only route-eligible if the state visited
    /// immediately before `source` equals this state.
    pub predecessor: Option<String>,
}

/// Accumulates states and actions before graph materialization.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    name: String,
    states: Vec<State>,
    state_index: HashMap<String, usize>,
    actions: Vec<Action>,
    action_index: HashMap<(String, String), usize>,
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Insert a state keyed by name. A repeated name replaces the earlier
    /// definition in place, keeping its authored position.
    pub fn add_state(&mut self, state: State) {
        match self.state_index.get(&state.name) {
            Some(&index) => self.states[index] = state,
            None => {
                self.state_index.insert(state.name.clone(), self.states.len());
                self.states.push(state);
            }
        }
    }

    /// Insert an action keyed by `(source, name)`. Last write wins, authored
    /// position kept. Endpoint references are checked by [`Self::build`].
    pub fn add_action(&mut self, action: Action) {
        let key = (action.source.clone(), action.name.clone());
        match self.action_index.get(&key) {
            Some(&index) => self.actions[index] = action,
            None => {
                self.action_index.insert(key, self.actions.len());
                self.actions.push(action);
            }
        }
    }

    /// Materialize the directed graph. Must precede any planning.
    ///
    /// Fails with [`Error::ConfigInvalid`] on a reserved state name or an
    /// action referencing an unknown state. An action successor may name the
    /// reserved identify sentinel, which materializes the sentinel node.
    pub fn build(self) -> Result<StateGraph> {
        if self.state_index.contains_key(IDENTIFY_STATE) {
            return Err(Error::ConfigInvalid(format!(
                "'{IDENTIFY_STATE}' is reserved and cannot be an authored state"
            )));
        }

        let mut outgoing: HashMap<String, Vec<Action>> = HashMap::new();
        let mut sentinel_referenced = false;
        for action in &self.actions {
            if !self.state_index.contains_key(&action.source) {
                return Err(Error::ConfigInvalid(format!(
                    "action '{}' has unknown source state '{}'",
                    action.name, action.source
                )));
            }
            if action.successor == IDENTIFY_STATE {
                sentinel_referenced = true;
            } else if !self.state_index.contains_key(&action.successor) {
                return Err(Error::ConfigInvalid(format!(
                    "action '{}' in state '{}' has unknown successor '{}'",
                    action.name, action.source, action.successor
                )));
            }
            if let Some(predecessor) = &action.predecessor {
                if !self.state_index.contains_key(predecessor) {
                    return Err(Error::ConfigInvalid(format!(
                        "action '{}' in state '{}' has unknown predecessor '{}'",
                        action.name, action.source, predecessor
                    )));
                }
            }
            outgoing
                .entry(action.source.clone())
                .or_default()
                .push(action.clone());
        }

        Ok(StateGraph {
            name: self.name,
            states: self.states,
            state_index: self.state_index,
            outgoing,
            sentinel_referenced,
        })
    }
}

/// Immutable directed multigraph over authored states; uniform edge weight.
#[derive(Debug, Clone)]
pub struct StateGraph {
    name: String,
    states: Vec<State>,
    state_index: HashMap<String, usize>,
    outgoing: HashMap<String, Vec<Action>>,
    sentinel_referenced: bool,
}

impl StateGraph {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All authored states in authored order.
    pub fn all_states(&self) -> &[State] {
        &self.states
    }

    pub fn state(&self, id: &str) -> Result<&State> {
        self.state_index
            .get(id)
            .map(|&index| &self.states[index])
            .ok_or_else(|| Error::UnknownState(id.to_string()))
    }

    pub fn kind(&self, id: &str) -> Result<StateKind> {
        Ok(self.state(id)?.kind)
    }

    /// Outgoing actions of a node in authored order; empty for the sentinel
    /// and for unknown ids.
    pub fn actions_from(&self, id: &str) -> &[Action] {
        self.outgoing.get(id).map_or(&[], Vec::as_slice)
    }

    /// Whether `id` is a routable node: an authored state, or the identify
    /// sentinel when at least one action routes to it.
    pub fn contains_node(&self, id: &str) -> bool {
        self.state_index.contains_key(id)
            || (id == IDENTIFY_STATE && self.sentinel_referenced)
    }
}

#[cfg(test)]
mod tests {
    use super::{Action, GraphBuilder, State};
    use crate::core::types::{Condition, IDENTIFY_STATE, Method, StateKind};
    use crate::error::Error;

    fn state(name: &str, kind: StateKind) -> State {
        State {
            name: name.to_string(),
            kind,
            conditions: Condition::parse_list(&format!("{name}_marker")),
        }
    }

    fn click(name: &str, source: &str, successor: &str) -> Action {
        Action {
            name: name.to_string(),
            source: source.to_string(),
            successor: successor.to_string(),
            method: Method::Click,
            condition: format!("{name}_button"),
            predecessor: None,
        }
    }

    #[test]
    fn add_state_last_write_wins_keeps_position() {
        let mut builder = GraphBuilder::new("g");
        builder.add_state(state("a", StateKind::Normal));
        builder.add_state(state("b", StateKind::Normal));
        builder.add_state(state("a", StateKind::Jump));

        let graph = builder.build().expect("build");
        let names: Vec<&str> = graph.all_states().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(graph.kind("a").expect("kind"), StateKind::Jump);
    }

    #[test]
    fn add_action_last_write_wins() {
        let mut builder = GraphBuilder::new("g");
        builder.add_state(state("a", StateKind::Normal));
        builder.add_state(state("b", StateKind::Normal));
        builder.add_state(state("c", StateKind::Normal));
        builder.add_action(click("go", "a", "b"));
        builder.add_action(click("go", "a", "c"));

        let graph = builder.build().expect("build");
        let actions = graph.actions_from("a");
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].successor, "c");
    }

    #[test]
    fn build_rejects_unknown_successor() {
        let mut builder = GraphBuilder::new("g");
        builder.add_state(state("a", StateKind::Normal));
        builder.add_action(click("go", "a", "missing"));

        let err = builder.build().expect_err("must fail");
        assert!(matches!(err, Error::ConfigInvalid(_)));
    }

    #[test]
    fn build_rejects_reserved_state_name() {
        let mut builder = GraphBuilder::new("g");
        builder.add_state(state(IDENTIFY_STATE, StateKind::Normal));

        let err = builder.build().expect_err("must fail");
        assert!(matches!(err, Error::ConfigInvalid(_)));
    }

    #[test]
    fn sentinel_successor_materializes_node() {
        let mut builder = GraphBuilder::new("g");
        builder.add_state(state("popup", StateKind::Jump));
        builder.add_action(click("close", "popup", IDENTIFY_STATE));

        let graph = builder.build().expect("build");
        assert!(graph.contains_node(IDENTIFY_STATE));
        assert!(graph.actions_from(IDENTIFY_STATE).is_empty());
    }

    #[test]
    fn state_lookup_fails_for_unknown_id() {
        let graph = GraphBuilder::new("g").build().expect("build");
        let err = graph.state("ghost").expect_err("must fail");
        assert!(matches!(err, Error::UnknownState(name) if name == "ghost"));
    }
}
