//! Perception-driven state navigator.
//!
//! Models an interactive environment (a device screen, an emulator, any
//! observable UI) as a directed graph of named states joined by actions, and
//! drives it from one state to another by repeatedly classifying what is on
//! screen, planning a route, and executing primitive interactions. The
//! architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (the state graph, route
//!   planning). No I/O, fully testable in isolation.
//! - **[`io`]**: The boundary to the outside world (profile loading, the
//!   [`Perception`](io::ports::Perception) and [`Device`](io::ports::Device)
//!   ports). Isolated to enable scripted implementations in tests.
//!
//! [`engine`] coordinates core logic with the ports to implement the
//! perception-act-verify loop; [`classify`] and [`observer`] support it.

pub mod classify;
pub mod core;
pub mod engine;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod observer;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
