//! Exit code constants for the kodu CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid state, I/O)
//! - 2: Configuration error (template, prompt config, tool schema, config file)
//! - 3: Patch failure (diff mismatch, transaction not applied)
//! - 4: Protocol violation (malformed or multi-tool model response)
//! - 5: Git operation failure
//! - 6: Invalid state transition

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid state, or I/O failure.
pub const USER_ERROR: i32 = 1;

/// Configuration error: invalid template, prompt config, tool schema or config file.
pub const CONFIG_ERROR: i32 = 2;

/// Patch failure: a diff did not match the current file content.
pub const PATCH_FAILURE: i32 = 3;

/// Protocol violation: the model response could not be accepted as a tool call.
pub const PROTOCOL_VIOLATION: i32 = 4;

/// Git operation failure.
pub const GIT_FAILURE: i32 = 5;

/// An approval or session state transition was not allowed.
pub const INVALID_TRANSITION: i32 = 6;
