//! Agent orchestration for kodu.
//!
//! This module provides:
//!
//! - **Roles**: the agent roles, their tool subsets and default templates
//! - **Prompt**: template language and the system prompt builder
//! - **Dispatch**: tool invocation approval and execution
//! - **Spawner**: sub-agent sessions stacked on a root conversation
//!
//! Only the dispatcher's edit context writes to the workspace; the model
//! proposes, the host approves, and the diff engine applies.

pub mod dispatch;
pub mod prompt;
mod roles;
pub mod spawner;

pub use roles::{AgentRole, build_role_prompt, role_builder, role_registry};
