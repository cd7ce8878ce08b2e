//! Kodu: the prompt-and-tool protocol layer of a coding agent.
//!
//! - **Prompt**: validated templates with feature-gated blocks, rendered into
//!   role system prompts ([`agent::prompt`], [`agent::build_role_prompt`])
//! - **Tools**: declarative tool schemas, per-role registries and the
//!   single-call wire parser ([`tools`])
//! - **Dispatch**: the approval state machine and tool dispatcher
//!   ([`agent::dispatch`])
//! - **Spawner**: sub-agent sessions stacked on a root conversation
//!   ([`agent::spawner`])
//! - **Diff**: the all-or-nothing patch engine and versioned file edits
//!   ([`diff`])

pub mod agent;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod diff;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod fs;
pub mod git;
pub mod tools;

#[cfg(test)]
pub(crate) mod test_support;
