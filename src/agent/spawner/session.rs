//! Agent sessions.

use crate::agent::dispatch::Dispatcher;
use crate::agent::roles::AgentRole;
use crate::error::{KoduError, Result};
use crate::tools::ToolRegistry;
use chrono::Utc;
use serde::Serialize;
use std::fmt;

/// Lifecycle of a session. `Running` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Running,
    Done,
    Aborted,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Running => "RUNNING",
            SessionState::Done => "DONE",
            SessionState::Aborted => "ABORTED",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One entry of a session's conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationMessage {
    pub role: Speaker,
    pub content: String,
}

/// An agent session: the root agent or a spawned sub-agent.
#[derive(Debug, Clone, Serialize)]
pub struct SubAgentSession {
    pub role: AgentRole,
    /// The name the agent calls itself.
    pub name: String,
    pub state: SessionState,
    pub ts: i64,
    pub system_prompt: String,
    pub history: Vec<ConversationMessage>,
    /// The `exit_agent` result once the session is done.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip)]
    pub(super) dispatcher: Dispatcher,
    #[serde(skip)]
    pub(super) registry: ToolRegistry,
}

impl SubAgentSession {
    pub(super) fn new(
        role: AgentRole,
        name: String,
        system_prompt: String,
        registry: ToolRegistry,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            role,
            name,
            state: SessionState::Running,
            ts: Utc::now().timestamp_millis(),
            system_prompt,
            history: Vec::new(),
            result: None,
            dispatcher,
            registry,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub(super) fn push(&mut self, role: Speaker, content: impl Into<String>) {
        self.history.push(ConversationMessage {
            role,
            content: content.into(),
        });
    }

    /// Move a running session to a terminal state.
    pub(super) fn finish(&mut self, state: SessionState) -> Result<()> {
        if self.state != SessionState::Running || state == SessionState::Running {
            return Err(KoduError::InvalidTransition(format!(
                "{} session cannot go from {} to {}",
                self.role, self.state, state
            )));
        }
        self.state = state;
        Ok(())
    }
}

/// The first user message of a spawned session.
pub(super) fn spawn_message(instructions: &str, files: &[String]) -> String {
    let mut message = format!("<task>\n{}\n</task>", instructions.trim());
    if !files.is_empty() {
        message.push_str("\n<interested_files>\n");
        for file in files {
            message.push_str(&format!("- {}\n", file));
        }
        message.push_str("</interested_files>");
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::prompt::FeatureFlags;

    fn session() -> SubAgentSession {
        SubAgentSession::new(
            AgentRole::SubTask,
            "SubTaskAgent".to_string(),
            "prompt".to_string(),
            ToolRegistry::new(FeatureFlags::new()),
            Dispatcher::new(AgentRole::SubTask),
        )
    }

    #[test]
    fn finished_sessions_stay_finished() {
        let mut session = session();
        session.finish(SessionState::Done).unwrap();

        let err = session.finish(SessionState::Aborted).unwrap_err();
        assert!(matches!(err, KoduError::InvalidTransition(_)));
        assert!(err.to_string().contains("from DONE to ABORTED"));
    }

    #[test]
    fn spawn_message_lists_files() {
        let message = spawn_message("  Fix the parser. ", &["src/a.rs".to_string(), "src/b.rs".to_string()]);
        assert_eq!(
            message,
            "<task>\nFix the parser.\n</task>\n<interested_files>\n- src/a.rs\n- src/b.rs\n</interested_files>"
        );
        assert_eq!(spawn_message("x", &[]), "<task>\nx\n</task>");
    }

    #[test]
    fn session_state_serializes_upper_case() {
        let json = serde_json::to_value(session()).unwrap();
        assert_eq!(json["state"], "RUNNING");
        assert_eq!(json["role"], "sub_task");
    }
}
