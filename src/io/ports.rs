//! Port traits for the environment the engine drives.
//!
//! The engine has no dependency on any capture or OS-input technology; it
//! observes through [`Perception`] and interacts through [`Device`]. Tests
//! use scripted implementations that return predetermined frames and match
//! tables without touching a real screen.

use anyhow::Result;

use crate::core::types::{Direction, Rect};

/// A captured snapshot of the environment, opaque to the core.
///
/// Equality is byte equality; the engine compares consecutive frames to
/// detect that a scrollable area has stopped moving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Decides whether a reference template appears in a snapshot.
pub trait Perception {
    /// Locate `reference` inside `frame`, returning its bounding rectangle.
    fn match_area(&self, reference: &str, frame: &Frame) -> Result<Option<Rect>>;

    /// Whether `reference` appears anywhere in `frame`.
    fn contains(&self, reference: &str, frame: &Frame) -> Result<bool> {
        Ok(self.match_area(reference, frame)?.is_some())
    }
}

impl<P: Perception + ?Sized> Perception for &P {
    fn match_area(&self, reference: &str, frame: &Frame) -> Result<Option<Rect>> {
        (**self).match_area(reference, frame)
    }

    fn contains(&self, reference: &str, frame: &Frame) -> Result<bool> {
        (**self).contains(reference, frame)
    }
}

/// Captures snapshots and performs primitive interactions at device
/// coordinates.
pub trait Device {
    fn capture(&self) -> Result<Frame>;
    fn click(&self, x: u32, y: u32) -> Result<()>;
    fn swipe(&self, direction: Direction) -> Result<()>;
}

impl<D: Device + ?Sized> Device for &D {
    fn capture(&self) -> Result<Frame> {
        (**self).capture()
    }

    fn click(&self, x: u32, y: u32) -> Result<()> {
        (**self).click(x, y)
    }

    fn swipe(&self, direction: Direction) -> Result<()> {
        (**self).swipe(direction)
    }
}
