//! Execution engine: the perception-act-verify control loop.
//!
//! [`Engine::run_to`] drives the environment from a starting state to a
//! target by alternating classification polls, planning, and primitive
//! interactions. Self-correction ("drive to the expected state, then resume")
//! runs over an explicit stack of goal frames rather than recursion: pushing
//! a frame models nested recovery, popping resumes the parent, and the parent
//! always re-classifies before proceeding. Cancellation and
//! the fixed inter-poll delay are observed at the classification poll loop,
//! the engine's only suspension point.
//!
//! One engine instance drives one environment; `&mut self` on [`Engine::run_to`]
//! keeps goals sequential per instance.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::classify::Classifier;
use crate::core::graph::{Action, StateGraph};
use crate::core::planner::{Route, constrained_path};
use crate::core::types::{Direction, Method, StateKind, Target};
use crate::error::{Error, Result};
use crate::io::ports::{Device, Frame, Perception};
use crate::observer::{EngineEvent, NullObserver, Observer};

/// Cooperative stop signal, checked between polls. Cloneable across threads;
/// there is no safe preemption mid-actuation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Timing knobs for the control loop.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fixed delay between classification polls (the environment refreshes at
    /// a fixed rate; no adaptive backoff).
    pub poll_interval: Duration,
    /// Settle delay after issuing a swipe, before recapturing.
    pub swipe_settle: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            swipe_settle: Duration::from_millis(500),
        }
    }
}

/// Engine-level mode of one goal frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Classify the live environment and escape unexpected interstitials.
    Seek,
    /// Plan a constrained route for this frame's goal.
    Plan,
    /// Execute the next queued route action.
    Act,
    /// Confirm the goal state was reached.
    Verify,
}

/// One goal on the drive stack: either the caller's request or a nested
/// recovery.
#[derive(Debug)]
struct GoalFrame {
    from: String,
    target: Target,
    must_visit: BTreeSet<String>,
    mode: Mode,
    route: Route,
    cursor: usize,
}

impl GoalFrame {
    fn new(from: String, target: Target, must_visit: BTreeSet<String>) -> Self {
        Self {
            from,
            target,
            must_visit,
            mode: Mode::Seek,
            route: Route::default(),
            cursor: 0,
        }
    }

    /// Recovery goals never carry waypoints.
    fn recovery(from: String, target: Target) -> Self {
        Self::new(from, target, BTreeSet::new())
    }
}

/// Result of advancing one goal frame by one step.
enum Transition {
    Stay,
    Push(GoalFrame),
    Pop(String),
}

/// Drives one environment through its state graph via injected ports.
pub struct Engine<'g, P, D> {
    graph: &'g StateGraph,
    perception: P,
    device: D,
    classifier: Classifier,
    observer: Box<dyn Observer>,
    cancel: CancelToken,
    config: EngineConfig,
    last_reported: Option<String>,
}

impl<'g, P: Perception, D: Device> Engine<'g, P, D> {
    pub fn new(graph: &'g StateGraph, perception: P, device: D) -> Self {
        Self {
            graph,
            perception,
            device,
            classifier: Classifier::new(),
            observer: Box::new(NullObserver),
            cancel: CancelToken::new(),
            config: EngineConfig::default(),
            last_reported: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle for requesting a cooperative stop from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// The engine-owned hit-count table, for inspection.
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Drive the environment from `from` toward `target`, visiting every
    /// state in `must_visit` along the way. Returns the finally classified
    /// state: the target itself, or whatever classified when the target is
    /// [`Target::Identify`].
    ///
    /// `from` not matching the real current state is tolerated; the walk
    /// corrects course. Any error aborts the whole goal, is announced through
    /// the observer, and surfaces to the caller unretried.
    pub fn run_to(
        &mut self,
        from: &str,
        target: Target,
        must_visit: &BTreeSet<String>,
    ) -> Result<String> {
        let result = self.drive(from, target, must_visit.clone());
        if let Err(err) = &result {
            warn!(error = %err, "drive aborted");
            self.observer.notify(&EngineEvent::ErrorRaised {
                message: err.to_string(),
            });
        }
        result
    }

    fn drive(
        &mut self,
        from: &str,
        target: Target,
        must_visit: BTreeSet<String>,
    ) -> Result<String> {
        self.graph.state(from)?;
        if let Target::State(goal) = &target {
            self.graph.state(goal)?;
        }
        info!(from, target = target.node_id(), "drive started");

        let mut root = GoalFrame::new(from.to_string(), target, must_visit);
        let mut stack: Vec<GoalFrame> = Vec::new();
        loop {
            let frame = stack.last_mut().unwrap_or(&mut root);
            match self.step(frame)? {
                Transition::Stay => {}
                Transition::Push(child) => {
                    debug!(
                        from = %child.from,
                        target = child.target.node_id(),
                        depth = stack.len() + 1,
                        "recovery started"
                    );
                    stack.push(child);
                }
                Transition::Pop(state) => {
                    if stack.pop().is_none() {
                        info!(state = %state, "drive finished");
                        return Ok(state);
                    }
                    debug!(state = %state, depth = stack.len(), "recovery finished");
                }
            }
        }
    }

    fn step(&mut self, frame: &mut GoalFrame) -> Result<Transition> {
        match frame.mode {
            Mode::Seek => self.seek(frame),
            Mode::Plan => self.plan(frame),
            Mode::Act => self.act(frame),
            Mode::Verify => self.verify(frame),
        }
    }

    /// Classify the live environment. An *unexpected* interstitial state is
    /// escaped before planning; a state equal to the expectation proceeds
    /// normally even when its kind is `Jump` (jump states carry their own
    /// escape actions).
    fn seek(&mut self, frame: &mut GoalFrame) -> Result<Transition> {
        let (live, _snap) = self.poll_classify(Some(&frame.from))?;
        if live != frame.from && self.graph.kind(&live)? == StateKind::Jump {
            return Ok(Transition::Push(GoalFrame::recovery(
                live,
                Target::Identify,
            )));
        }
        frame.mode = Mode::Plan;
        Ok(Transition::Stay)
    }

    fn plan(&mut self, frame: &mut GoalFrame) -> Result<Transition> {
        let route = constrained_path(
            self.graph,
            &frame.from,
            frame.target.node_id(),
            &frame.must_visit,
        )?;
        debug!(
            from = %frame.from,
            target = frame.target.node_id(),
            steps = route.len(),
            "route planned"
        );
        frame.cursor = 0;
        frame.mode = if route.is_empty() {
            Mode::Verify
        } else {
            Mode::Act
        };
        frame.route = route;
        Ok(Transition::Stay)
    }

    /// Execute the route action under the cursor, correcting for drift first.
    fn act(&mut self, frame: &mut GoalFrame) -> Result<Transition> {
        let Some(action) = frame.route.actions.get(frame.cursor).cloned() else {
            frame.mode = Mode::Verify;
            return Ok(Transition::Stay);
        };

        let (live, snap) = self.poll_classify(Some(&action.source))?;
        if live != action.source {
            if self.graph.kind(&live)? == StateKind::Jump {
                return Ok(Transition::Push(GoalFrame::recovery(
                    live,
                    Target::Identify,
                )));
            }
            // The environment may have jumped ahead; rejoin the route instead
            // of re-executing skipped actions.
            if let Some(offset) = frame.route.actions[frame.cursor..]
                .iter()
                .position(|a| a.source == live)
            {
                debug!(state = %live, skipped = offset, "fast-forwarding route");
                frame.cursor += offset;
                return Ok(Transition::Stay);
            }
            if frame.route.final_state() == Some(live.as_str()) {
                debug!(state = %live, "route target reached early");
                frame.mode = Mode::Verify;
                return Ok(Transition::Stay);
            }
            return Ok(Transition::Push(GoalFrame::recovery(
                live,
                Target::State(action.source.clone()),
            )));
        }

        let performed = match action.method {
            Method::Click => self.click_action(&action, &snap)?,
            Method::Swipe => self.swipe_search(&action, &snap)?,
        };
        if performed {
            info!(
                action = %action.name,
                from = %action.source,
                to = %action.successor,
                "action executed"
            );
            self.observer.notify(&EngineEvent::ActionExecuted {
                state: action.source.clone(),
                action: action.name.clone(),
                successor: action.successor.clone(),
            });
            frame.cursor += 1;
            if frame.cursor == frame.route.len() {
                frame.mode = Mode::Verify;
            }
        }
        self.pause();
        Ok(Transition::Stay)
    }

    /// Confirm the goal after the route is exhausted. A stable wrong state is
    /// fatal; an interstitial one is escaped and verification repeats.
    fn verify(&mut self, frame: &mut GoalFrame) -> Result<Transition> {
        let (live, _snap) = self.poll_classify(frame.target.hint())?;
        match &frame.target {
            Target::Identify => Ok(Transition::Pop(live)),
            Target::State(goal) if live == *goal => Ok(Transition::Pop(live)),
            Target::State(_) => {
                if self.graph.kind(&live)?.is_direct() {
                    Err(Error::CannotMoveForward(live))
                } else {
                    Ok(Transition::Push(GoalFrame::recovery(
                        live,
                        Target::Identify,
                    )))
                }
            }
        }
    }

    /// Poll snapshots until one classifies. `Ok(None)` classifications drive
    /// another poll after the fixed interval; cancellation is observed here.
    fn poll_classify(&mut self, hint: Option<&str>) -> Result<(String, Frame)> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let snap = self.device.capture().map_err(Error::Port)?;
            self.observer.notify(&EngineEvent::FrameCaptured);
            if let Some(hit) =
                self.classifier
                    .classify(self.graph, &self.perception, &snap, hint)?
            {
                self.observer.notify(&EngineEvent::StateClassified {
                    state: hit.state.clone(),
                    regions: hit.regions.clone(),
                });
                if self.last_reported.as_deref() != Some(hit.state.as_str()) {
                    self.observer.notify(&EngineEvent::StateChanged {
                        from: self.last_reported.clone(),
                        to: hit.state.clone(),
                    });
                    self.last_reported = Some(hit.state.clone());
                }
                return Ok((hit.state, snap));
            }
            self.pause();
        }
    }

    /// Click a uniformly random point inside the action target's rectangle,
    /// never a fixed pixel. A target not visible this poll is a retry, not a
    /// failure: no actuation happens and the cursor stays put.
    fn click_action(&mut self, action: &Action, snap: &Frame) -> Result<bool> {
        let area = self
            .perception
            .match_area(&action.condition, snap)
            .map_err(Error::Port)?;
        let Some(rect) = area else {
            warn!(
                action = %action.name,
                condition = %action.condition,
                "click target not visible, retrying next poll"
            );
            self.observer.notify(&EngineEvent::ClickMissed {
                state: action.source.clone(),
                action: action.name.clone(),
            });
            return Ok(false);
        };
        let mut rng = rand::thread_rng();
        let x = rng.gen_range(rect.left..=rect.right);
        let y = rng.gen_range(rect.top..=rect.bottom);
        debug!(x, y, action = %action.name, "click");
        self.device.click(x, y).map_err(Error::Port)?;
        Ok(true)
    }

    /// Scroll toward the action's target: first one direction, then the
    /// opposite, until the condition matches or two consecutive snapshots in
    /// the same direction are byte-identical (end of the scrollable area).
    fn swipe_search(&mut self, action: &Action, start: &Frame) -> Result<bool> {
        let first = match self.graph.kind(&action.source)? {
            StateKind::VerticalSwipe => Direction::Down,
            _ => Direction::Right,
        };

        let mut current = start.clone();
        let mut satisfied = self
            .perception
            .contains(&action.condition, &current)
            .map_err(Error::Port)?;
        'directions: for direction in [first, first.opposite()] {
            debug!(?direction, action = %action.name, "swipe search");
            while !satisfied {
                if self.cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                let previous = current.clone();
                self.device.swipe(direction).map_err(Error::Port)?;
                self.observer
                    .notify(&EngineEvent::SwipeIssued { direction });
                self.settle();
                current = self.device.capture().map_err(Error::Port)?;
                satisfied = self
                    .perception
                    .contains(&action.condition, &current)
                    .map_err(Error::Port)?;
                if !satisfied && current == previous {
                    continue 'directions;
                }
            }
            break;
        }

        if !satisfied {
            return Err(Error::CannotFindActionBySwipe {
                state: action.source.clone(),
                action: action.name.clone(),
            });
        }
        self.click_action(action, &current)
    }

    fn pause(&self) {
        if !self.config.poll_interval.is_zero() {
            thread::sleep(self.config.poll_interval);
        }
    }

    fn settle(&self) {
        if !self.config.swipe_settle.is_zero() {
            thread::sleep(self.config.swipe_settle);
        }
    }
}
