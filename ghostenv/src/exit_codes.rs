//! Stable exit codes for the ghostenv CLI.
//!
//! A user script, interactive session or editor exit code is passed through
//! unchanged and may coincide with any of these.

/// Command succeeded.
pub const OK: i32 = 0;
/// Validation, allocation, creation, install or launch failure.
pub const FAILURE: i32 = 1;
/// Cancelled with Ctrl+C.
pub const INTERRUPTED: i32 = 130;
