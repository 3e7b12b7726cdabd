//! Scripted ports and graph builders for deterministic tests.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use anyhow::{Context, Result};

use crate::core::graph::{Action, GraphBuilder, State, StateGraph};
use crate::core::types::{Condition, Direction, Method, Rect, StateKind};
use crate::io::ports::{Device, Frame, Perception};

/// Frame whose bytes are a label, so scenarios read as screen names.
pub fn frame(label: &str) -> Frame {
    Frame::new(label.as_bytes().to_vec())
}

/// Perception backed by an explicit `(reference, frame) -> rect` table.
#[derive(Debug, Default)]
pub struct ScriptedPerception {
    matches: HashMap<(String, Vec<u8>), Rect>,
}

impl ScriptedPerception {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that `reference` is visible in `frame` at `rect`.
    pub fn with_match(mut self, reference: &str, frame: &Frame, rect: Rect) -> Self {
        self.matches
            .insert((reference.to_string(), frame.bytes().to_vec()), rect);
        self
    }
}

impl Perception for ScriptedPerception {
    fn match_area(&self, reference: &str, frame: &Frame) -> Result<Option<Rect>> {
        Ok(self
            .matches
            .get(&(reference.to_string(), frame.bytes().to_vec()))
            .copied())
    }
}

/// Device that replays a frame timeline and records interactions.
///
/// Each capture consumes the next queued frame; the final frame repeats
/// forever so poll loops stay deterministic.
#[derive(Debug, Default)]
pub struct ScriptedDevice {
    frames: RefCell<VecDeque<Frame>>,
    clicks: RefCell<Vec<(u32, u32)>>,
    swipes: RefCell<Vec<Direction>>,
}

impl ScriptedDevice {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: RefCell::new(frames.into()),
            ..Self::default()
        }
    }

    pub fn clicks(&self) -> Vec<(u32, u32)> {
        self.clicks.borrow().clone()
    }

    pub fn swipes(&self) -> Vec<Direction> {
        self.swipes.borrow().clone()
    }
}

impl Device for ScriptedDevice {
    fn capture(&self) -> Result<Frame> {
        let mut frames = self.frames.borrow_mut();
        if frames.len() > 1 {
            return frames.pop_front().context("scripted frame queue underflow");
        }
        frames.front().cloned().context("scripted device has no frames")
    }

    fn click(&self, x: u32, y: u32) -> Result<()> {
        self.clicks.borrow_mut().push((x, y));
        Ok(())
    }

    fn swipe(&self, direction: Direction) -> Result<()> {
        self.swipes.borrow_mut().push(direction);
        Ok(())
    }
}

/// Deterministic state with a single `<name>_marker` condition.
pub fn marker_state(name: &str, kind: StateKind) -> State {
    State {
        name: name.to_string(),
        kind,
        conditions: Condition::parse_list(&format!("{name}_marker")),
    }
}

/// Click action locating `<name>_button`.
pub fn click_action(name: &str, source: &str, successor: &str) -> Action {
    Action {
        name: name.to_string(),
        source: source.to_string(),
        successor: successor.to_string(),
        method: Method::Click,
        condition: format!("{name}_button"),
        predecessor: None,
    }
}

/// Swipe action locating `<name>_button`.
pub fn swipe_action(name: &str, source: &str, successor: &str) -> Action {
    Action {
        method: Method::Swipe,
        ..click_action(name, source, successor)
    }
}

/// Build a graph from plain state and action lists.
pub fn build_graph(states: Vec<State>, actions: Vec<Action>) -> StateGraph {
    let mut builder = GraphBuilder::new("scripted");
    for state in states {
        builder.add_state(state);
    }
    for action in actions {
        builder.add_action(action);
    }
    builder.build().expect("scripted graph must build")
}
