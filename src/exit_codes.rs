//! Stable exit codes for pilot CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed due to an invalid profile, unknown states, or other errors.
pub const INVALID: i32 = 1;
/// `pilot plan` found no route satisfying the request.
pub const NO_PATH: i32 = 2;
