//! Tool dispatch and approval.
//!
//! This module provides:
//!
//! - **Approval**: the per-invocation state machine
//! - **Dispatcher**: surfaces typed calls, asks the [`ToolHost`] for a
//!   decision, and executes approved calls
//! - **Response**: the success / rejected / error signal fed back to the
//!   model, and the diff-fixer repair request

mod approval;
mod dispatcher;
mod response;


pub use approval::{ApprovalEvent, ApprovalState, TransitionError};
pub use dispatcher::{Decision, Dispatched, Dispatcher, EditContext, Invocation, ToolHost};
pub use response::{DiffFixerRequest, ToolResponse};
