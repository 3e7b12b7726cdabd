//! Side-effecting boundaries: injected device/perception ports and profile
//! loading.

pub mod ports;
pub mod profile;
