//! The Approval State Machine.
//!
//! ```text
//! undefined --surface--> pending --approve--> approved --begin--> loading
//!                           |                    |                  |
//!                           +--reject--> rejected|                  +--succeed--> completed
//!                                                +--fail----------> error <--fail--+
//! ```
//!
//! `abandon` takes `pending` to `rejected` and `approved`/`loading` to
//! `error`. Every other pair is a [`TransitionError`].

use crate::error::KoduError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Lifecycle state of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ApprovalState {
    /// Not yet surfaced. Never rendered or executed.
    Undefined,
    Pending,
    Approved,
    Loading,
    /// Execution finished successfully.
    Completed,
    Rejected {
        #[serde(skip_serializing_if = "Option::is_none")]
        feedback: Option<String>,
    },
    Error {
        message: String,
    },
}

/// Something that happens to an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalEvent {
    Surface,
    Approve,
    Reject { feedback: Option<String> },
    BeginExecution,
    Succeed,
    Fail { message: String },
    Abandon,
}

impl ApprovalEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ApprovalEvent::Surface => "surface",
            ApprovalEvent::Approve => "approve",
            ApprovalEvent::Reject { .. } => "reject",
            ApprovalEvent::BeginExecution => "begin executing",
            ApprovalEvent::Succeed => "complete",
            ApprovalEvent::Fail { .. } => "fail",
            ApprovalEvent::Abandon => "abandon",
        }
    }
}

/// An event that is not legal in the current state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot {event} a tool call that is {from}")]
pub struct TransitionError {
    pub from: &'static str,
    pub event: &'static str,
}

impl From<TransitionError> for KoduError {
    fn from(e: TransitionError) -> Self {
        KoduError::InvalidTransition(e.to_string())
    }
}

impl ApprovalState {
    pub fn name(&self) -> &'static str {
        match self {
            ApprovalState::Undefined => "undefined",
            ApprovalState::Pending => "pending",
            ApprovalState::Approved => "approved",
            ApprovalState::Loading => "loading",
            ApprovalState::Completed => "completed",
            ApprovalState::Rejected { .. } => "rejected",
            ApprovalState::Error { .. } => "error",
        }
    }

    /// The state the rendering layer sees. `None` while undefined; a
    /// completed call shows as `approved`.
    pub fn wire_status(&self) -> Option<&'static str> {
        match self {
            ApprovalState::Undefined => None,
            ApprovalState::Completed => Some("approved"),
            other => Some(other.name()),
        }
    }

    /// No further events are accepted.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApprovalState::Completed | ApprovalState::Rejected { .. } | ApprovalState::Error { .. }
        )
    }

    /// Apply `event`, returning the next state.
    pub fn transition(&self, event: ApprovalEvent) -> Result<ApprovalState, TransitionError> {
        use ApprovalEvent as E;
        use ApprovalState as S;

        let next = match (self, event) {
            (S::Undefined, E::Surface) => S::Pending,
            (S::Pending, E::Approve) => S::Approved,
            (S::Pending, E::Reject { feedback }) => S::Rejected { feedback },
            (S::Approved, E::BeginExecution) => S::Loading,
            (S::Loading, E::Succeed) => S::Completed,
            (S::Approved | S::Loading, E::Fail { message }) => S::Error { message },
            (S::Pending, E::Abandon) => S::Rejected { feedback: None },
            (S::Approved | S::Loading, E::Abandon) => S::Error {
                message: "aborted".to_string(),
            },
            (from, event) => {
                return Err(TransitionError {
                    from: from.name(),
                    event: event.name(),
                });
            }
        };
        Ok(next)
    }
}

impl fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
