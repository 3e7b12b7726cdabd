//! Typed failure taxonomy for profile loading, planning, and driving.
//!
//! Low-level "no match this poll" outcomes are not errors; they drive another
//! poll iteration. Only exhaustion of a bounded strategy (swipe search, an
//! unsatisfiable planning request) or a structural problem becomes an `Error`.
//! Nothing here is retried automatically; a supervising layer may restart a
//! failed goal.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or structurally inconsistent profile (duplicate ids,
    /// reference to an unknown state, reserved names). Raised at load/build
    /// time, never while driving.
    #[error("invalid profile: {0}")]
    ConfigInvalid(String),

    /// Planning or execution referenced a state id absent from the graph.
    #[error("unknown state '{0}'")]
    UnknownState(String),

    /// The search space was exhausted without a constraint-satisfying route.
    /// An expected outcome for callers to report, not a programming error.
    #[error("no route from '{from}' to '{to}' satisfies the constraints")]
    NoPathFound { from: String, to: String },

    /// A route walk ended in a stable state that is neither the goal nor
    /// recoverable.
    #[error("cannot move forward: stuck in stable state '{0}'")]
    CannotMoveForward(String),

    /// Both swipe directions were exhausted without locating the action's
    /// target.
    #[error("swipe search exhausted for action '{action}' in state '{state}'")]
    CannotFindActionBySwipe { state: String, action: String },

    /// The cooperative stop token was observed between polls.
    #[error("drive cancelled")]
    Cancelled,

    /// An injected perception/actuation port failed.
    #[error("port failure: {0:#}")]
    Port(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
