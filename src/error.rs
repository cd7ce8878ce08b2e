//! Error types for kodu.
//!
//! Uses thiserror for derive macros. Every variant maps to a process exit code
//! so the CLI can report failures precisely.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for kodu operations.
#[derive(Error, Debug)]
pub enum KoduError {
    /// User provided invalid arguments, or an I/O operation failed.
    #[error("{0}")]
    UserError(String),

    /// Invalid template, prompt configuration, tool schema, or config file.
    ///
    /// These are construction-time failures: nothing is rendered from an
    /// invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A diff could not be applied to the current file content.
    #[error("Patch failed: {0}")]
    PatchFailed(String),

    /// The model response is not an acceptable tool invocation.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Git operation failed.
    #[error("Git operation failed: {0}")]
    GitError(String),

    /// An approval or session state transition is not allowed.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

impl KoduError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            KoduError::UserError(_) => exit_codes::USER_ERROR,
            KoduError::ConfigError(_) => exit_codes::CONFIG_ERROR,
            KoduError::PatchFailed(_) => exit_codes::PATCH_FAILURE,
            KoduError::ProtocolViolation(_) => exit_codes::PROTOCOL_VIOLATION,
            KoduError::GitError(_) => exit_codes::GIT_FAILURE,
            KoduError::InvalidTransition(_) => exit_codes::INVALID_TRANSITION,
        }
    }
}

/// Result type alias for kodu operations.
pub type Result<T> = std::result::Result<T, KoduError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_has_correct_exit_code() {
        let err = KoduError::ConfigError("unknown placeholder".to_string());
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);
    }

    #[test]
    fn patch_error_has_correct_exit_code() {
        let err = KoduError::PatchFailed("block 1 not found".to_string());
        assert_eq!(err.exit_code(), exit_codes::PATCH_FAILURE);
    }

    #[test]
    fn protocol_violation_has_correct_exit_code() {
        let err = KoduError::ProtocolViolation("two tool calls".to_string());
        assert_eq!(err.exit_code(), exit_codes::PROTOCOL_VIOLATION);
    }

    #[test]
    fn git_and_transition_errors_have_correct_exit_codes() {
        assert_eq!(
            KoduError::GitError("commit failed".to_string()).exit_code(),
            exit_codes::GIT_FAILURE
        );
        assert_eq!(
            KoduError::InvalidTransition("rejected -> loading".to_string()).exit_code(),
            exit_codes::INVALID_TRANSITION
        );
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = KoduError::ConfigError("missing agent name".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing agent name");

        let err = KoduError::UserError("file not found".to_string());
        assert_eq!(err.to_string(), "file not found");
    }
}
