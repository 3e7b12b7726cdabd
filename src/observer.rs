//! Outbound engine events with fire-and-forget delivery.
//!
//! Events are emitted as they occur and must never stall the control loop: an
//! [`Observer`] implementation is expected to return promptly, and the
//! provided [`ChannelObserver`] forwards over an unbounded channel and drops
//! events once the receiver is gone.

use std::sync::mpsc::Sender;

use crate::core::types::{Direction, Rect};

/// Observable moments in a drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A snapshot was captured from the device.
    FrameCaptured,
    /// A frame classified to a state.
    StateClassified { state: String, regions: Vec<Rect> },
    /// The classified state differs from the previously reported one.
    StateChanged { from: Option<String>, to: String },
    /// A transition's interaction was performed.
    ActionExecuted {
        state: String,
        action: String,
        successor: String,
    },
    /// A click target was not visible this poll; the engine retries.
    ClickMissed { state: String, action: String },
    /// A swipe was issued during a swipe search.
    SwipeIssued { direction: Direction },
    /// An error is about to surface to the caller.
    ErrorRaised { message: String },
}

/// Receives engine events. The default implementation ignores everything, so
/// observers override only what they care about.
pub trait Observer {
    fn notify(&self, event: &EngineEvent) {
        let _ = event;
    }
}

/// Observer that discards all events.
#[derive(Debug, Default)]
pub struct NullObserver;

impl Observer for NullObserver {}

/// Forwards events over an unbounded channel. Sending never blocks; a dropped
/// receiver silently loses events rather than stalling the engine.
#[derive(Debug)]
pub struct ChannelObserver {
    sender: Sender<EngineEvent>,
}

impl ChannelObserver {
    pub fn new(sender: Sender<EngineEvent>) -> Self {
        Self { sender }
    }
}

impl Observer for ChannelObserver {
    fn notify(&self, event: &EngineEvent) {
        let _ = self.sender.send(event.clone());
    }
}
