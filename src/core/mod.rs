//! Deterministic, pure logic for the state graph and route planner.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod graph;
pub mod planner;
pub mod types;
