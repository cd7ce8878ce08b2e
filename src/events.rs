//! Append-only protocol event log.
//!
//! Events are stored as NDJSON (one JSON object per line) in
//! `.kodu/events/events.ndjson`.
//!
//! # Event Format
//!
//! - `ts`: RFC3339 timestamp
//! - `action`: what happened (`tool_approved`, `patch_failed`, ...)
//! - `actor`: the owner string (`user@HOST`)
//! - `tool`, `path`, `agent`: optional subject keys
//! - `details`: freeform object with action-specific details
//!
//! # Usage
//!
//! ```no_run
//! use kodu::context::WorkspaceContext;
//! use kodu::events::{Event, EventAction, append_event};
//! use serde_json::json;
//!
//! let ctx = WorkspaceContext::resolve()?;
//! let event = Event::new(EventAction::PatchApplied)
//!     .with_path("src/lib.rs")
//!     .with_details(json!({"blocks": 2}));
//! append_event(&ctx, &event)?;
//! # Ok::<(), kodu::error::KoduError>(())
//! ```

use crate::context::WorkspaceContext;
use crate::error::{KoduError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// A system prompt was rendered for a role
    PromptBuilt,
    /// A tool call was shown to the user (undefined -> pending)
    ToolSurfaced,
    ToolApproved,
    ToolRejected,
    /// Execution started (approved -> loading)
    ToolExecuting,
    ToolCompleted,
    ToolFailed,
    /// An in-flight call was abandoned by the host
    ToolAbandoned,
    /// A model response broke the invocation protocol
    ProtocolViolation,
    PatchApplied,
    PatchFailed,
    FileRollback,
    SubAgentSpawned,
    SubAgentExited,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventAction::PromptBuilt => "prompt_built",
            EventAction::ToolSurfaced => "tool_surfaced",
            EventAction::ToolApproved => "tool_approved",
            EventAction::ToolRejected => "tool_rejected",
            EventAction::ToolExecuting => "tool_executing",
            EventAction::ToolCompleted => "tool_completed",
            EventAction::ToolFailed => "tool_failed",
            EventAction::ToolAbandoned => "tool_abandoned",
            EventAction::ProtocolViolation => "protocol_violation",
            EventAction::PatchApplied => "patch_applied",
            EventAction::PatchFailed => "patch_failed",
            EventAction::FileRollback => "file_rollback",
            EventAction::SubAgentSpawned => "sub_agent_spawned",
            EventAction::SubAgentExited => "sub_agent_exited",
        };
        f.write_str(name)
    }
}

/// An event record for the protocol log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    pub action: EventAction,

    /// The actor who performed the action (e.g., `user@HOST`).
    pub actor: String,

    /// Tool name for tool-related events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,

    /// Workspace-relative file path for patch events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Agent role the event belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,

    pub details: Value,
}

impl Event {
    /// Create a new event stamped with the current time and actor.
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: get_actor_string(),
            tool: None,
            path: None,
            agent: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| KoduError::UserError(format!("failed to serialize event to JSON: {}", e)))
    }
}

fn get_actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Get the path to the events file.
pub fn events_file_path(ctx: &WorkspaceContext) -> PathBuf {
    ctx.events_file()
}

/// Append an event as one line to the events log, creating it if needed.
pub fn append_event(ctx: &WorkspaceContext, event: &Event) -> Result<()> {
    let events_file = events_file_path(ctx);
    let json_line = event.to_ndjson_line()?;

    let events_dir = ctx.events_dir();
    if !events_dir.exists() {
        fs::create_dir_all(&events_dir).map_err(|e| {
            KoduError::UserError(format!(
                "failed to create events directory '{}': {}",
                events_dir.display(),
                e
            ))
        })?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&events_file)
        .map_err(|e| {
            KoduError::UserError(format!(
                "failed to open events file '{}': {}",
                events_file.display(),
                e
            ))
        })?;

    writeln!(file, "{}", json_line).map_err(|e| {
        KoduError::UserError(format!(
            "failed to write event to '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    Ok(())
}

/// Best-effort logging: append when a workspace is attached, warn on failure.
///
/// Protocol steps never fail because the log could not be written.
pub fn record(ctx: Option<&WorkspaceContext>, event: Event) {
    let Some(ctx) = ctx else {
        return;
    };
    if let Err(e) = append_event(ctx, &event) {
        eprintln!("Warning: failed to log {} event: {}", event.action, e);
    }
}

/// Read every event from the log. A missing log yields an empty list.
pub fn read_events(ctx: &WorkspaceContext) -> Result<Vec<Event>> {
    let events_file = events_file_path(ctx);
    if !events_file.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&events_file).map_err(|e| {
        KoduError::UserError(format!(
            "failed to read events file '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| {
                KoduError::UserError(format!(
                    "malformed event on line {} of '{}': {}",
                    i + 1,
                    events_file.display(),
                    e
                ))
            })
        })
        .collect()
}
