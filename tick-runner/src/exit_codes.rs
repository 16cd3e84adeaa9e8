//! Stable exit codes for tick-runner CLI commands.

/// Command succeeded. Module faults during `run` are recovered and still exit OK.
pub const OK: i32 = 0;
/// Command failed due to invalid config, layout, or other I/O errors.
pub const INVALID: i32 = 1;
