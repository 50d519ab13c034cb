//! Stable exit codes for coach CLI commands.

/// Command succeeded, or the run produced simple or full feedback.
pub const OK: i32 = 0;
/// Invalid input or config, or any other command error.
pub const INVALID: i32 = 1;
/// The run resolved to a failure result.
pub const FAILED: i32 = 2;
