//! The Sub-Agent Spawner.
//!
//! A [`Conversation`] owns a stack of sessions. The root session is at the
//! bottom; an approved `spawn_agent` pushes a child and suspends the parent
//! with its `spawn_agent` call left `loading`. The child's `exit_agent`
//! result pops it and becomes that call's response. Only the top session
//! receives model turns.

mod session;

#[cfg(test)]
mod tests;

pub use session::{ConversationMessage, SessionState, Speaker, SubAgentSession};

use crate::agent::dispatch::{
    DiffFixerRequest, Dispatched, Dispatcher, EditContext, ToolHost, ToolResponse,
};
use crate::agent::roles::{AgentRole, build_role_prompt, role_registry};
use crate::error::{KoduError, Result};
use crate::events::{self, Event, EventAction};
use crate::tools::{ToolCall, parse_tool_call};
use serde_json::json;
use session::spawn_message;

/// What one model turn led to.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// A tool call finished; the response was appended to the session.
    ToolResult {
        response: ToolResponse,
        diff_fixer: Option<DiffFixerRequest>,
    },
    /// A child session was pushed and now receives turns.
    SubAgentStarted { role: AgentRole, depth: usize },
    /// The child exited; its result resolved the parent's `spawn_agent`.
    SubAgentFinished {
        role: AgentRole,
        result: String,
        response: ToolResponse,
    },
    /// `attempt_completion` succeeded in the root session.
    Completed { result: String },
    /// The turn held no tool call.
    NoToolCall,
    /// The turn broke the invocation protocol; the error was appended to
    /// the session so the model can retry.
    Reprompt { message: String },
}

/// A root session and the stack of sub-agents it spawned.
pub struct Conversation {
    sessions: Vec<SubAgentSession>,
    finished: Vec<SubAgentSession>,
    edits: EditContext,
}

impl Conversation {
    /// Start a conversation whose root session runs `role` on `task`.
    pub fn new(role: AgentRole, task: &str, edits: EditContext) -> Result<Self> {
        let mut conversation = Self {
            sessions: Vec::new(),
            finished: Vec::new(),
            edits,
        };
        let mut root = conversation.open_session(role, false)?;
        root.push(Speaker::User, format!("<task>\n{}\n</task>", task.trim()));
        conversation.sessions.push(root);
        Ok(conversation)
    }

    /// Number of sub-agents above the root.
    pub fn depth(&self) -> usize {
        self.sessions.len().saturating_sub(1)
    }

    pub fn root(&self) -> &SubAgentSession {
        &self.sessions[0]
    }

    /// The session receiving model turns.
    pub fn active(&self) -> &SubAgentSession {
        &self.sessions[self.sessions.len() - 1]
    }

    /// Sessions that have exited or been aborted, oldest first.
    pub fn finished(&self) -> &[SubAgentSession] {
        &self.finished
    }

    pub fn edits(&self) -> &EditContext {
        &self.edits
    }

    /// Feed one model response to the active session.
    pub fn step(&mut self, response: &str, host: &mut dyn ToolHost) -> Result<StepOutcome> {
        self.ensure_running()?;
        let depth = self.depth();
        let session = self.active_mut();
        session.push(Speaker::Assistant, response);

        let call = match parse_tool_call(response, &session.registry) {
            Ok(Some(call)) => call,
            Ok(None) => return Ok(StepOutcome::NoToolCall),
            Err(e) => return Ok(self.reprompt(e.to_string())),
        };

        if let ToolCall::ExitAgent { .. } = call
            && depth == 0
        {
            return Ok(self.reprompt("exit_agent can only be used by a sub-agent".to_string()));
        }

        let is_completion = matches!(call, ToolCall::AttemptCompletion { .. });
        let top = self.sessions.len() - 1;
        let dispatcher = &mut self.sessions[top].dispatcher;
        let dispatched = match dispatcher.dispatch(call, host, &mut self.edits) {
            Ok(dispatched) => dispatched,
            Err(KoduError::ProtocolViolation(message)) => return Ok(self.reprompt(message)),
            Err(e) => return Err(e),
        };

        match dispatched {
            Dispatched::Responded {
                response,
                diff_fixer,
            } => {
                let session = self.active_mut();
                session.push(Speaker::User, response.to_message());
                if is_completion && depth == 0 && response.status() == "success" {
                    session.finish(SessionState::Done)?;
                    let result = response_result(&response);
                    session.result = Some(result.clone());
                    return Ok(StepOutcome::Completed { result });
                }
                Ok(StepOutcome::ToolResult {
                    response,
                    diff_fixer,
                })
            }
            Dispatched::Spawn {
                agent,
                instructions,
                files,
            } => self.spawn(agent, &instructions, &files),
            Dispatched::Exit { result } => self.exit(result),
        }
    }

    /// Abort the active sub-agent, resolving the parent's `spawn_agent` to
    /// an error. At the root, abandon the outstanding invocation instead.
    pub fn abort(&mut self) -> Result<Option<ToolResponse>> {
        if self.depth() == 0 {
            return self.active_mut().dispatcher.abandon();
        }

        let mut child = self.pop()?;
        child.dispatcher.abandon()?;
        child.finish(SessionState::Aborted)?;
        self.log(
            EventAction::SubAgentExited,
            child.role,
            json!({ "state": child.state, "depth": self.depth() + 1 }),
        );
        let message = format!("the {} sub-agent was aborted", child.role);
        self.finished.push(child);

        let parent = self.active_mut();
        let response = parent.dispatcher.fail(message)?;
        parent.push(Speaker::User, response.to_message());
        Ok(Some(response))
    }

    fn spawn(&mut self, role: AgentRole, instructions: &str, files: &[String]) -> Result<StepOutcome> {
        let mut child = match self.open_session(role, true) {
            Ok(child) => child,
            Err(e) => {
                let parent = self.active_mut();
                let response = parent.dispatcher.fail(e.to_string())?;
                parent.push(Speaker::User, response.to_message());
                return Ok(StepOutcome::ToolResult {
                    response,
                    diff_fixer: None,
                });
            }
        };
        child.push(Speaker::User, spawn_message(instructions, files));
        self.sessions.push(child);

        let depth = self.depth();
        self.log(
            EventAction::SubAgentSpawned,
            role,
            json!({ "depth": depth, "files": files }),
        );
        Ok(StepOutcome::SubAgentStarted { role, depth })
    }

    fn exit(&mut self, result: String) -> Result<StepOutcome> {
        let mut child = self.pop()?;
        child.finish(SessionState::Done)?;
        child.result = Some(result.clone());
        let role = child.role;
        self.log(
            EventAction::SubAgentExited,
            role,
            json!({ "state": child.state, "depth": self.depth() + 1 }),
        );
        self.finished.push(child);

        let parent = self.active_mut();
        let response = parent.dispatcher.complete(result.clone())?;
        parent.push(Speaker::User, response.to_message());
        Ok(StepOutcome::SubAgentFinished {
            role,
            result,
            response,
        })
    }

    fn open_session(&self, role: AgentRole, is_child: bool) -> Result<SubAgentSession> {
        let config = &self.edits.config;
        let workspace = self.edits.editor.workspace();
        let system_prompt = build_role_prompt(role, config, &self.edits.system, None, Some(workspace))?;
        let registry = role_registry(role, config)?;

        let mut dispatcher = Dispatcher::new(role).with_workspace(workspace.clone());
        if is_child {
            dispatcher = dispatcher.for_sub_agent();
        }
        Ok(SubAgentSession::new(
            role,
            role.agent_name(&config.agent_name),
            system_prompt,
            registry,
            dispatcher,
        ))
    }

    fn reprompt(&mut self, message: String) -> StepOutcome {
        let role = self.active().role;
        events::record(
            Some(self.edits.editor.workspace()),
            Event::new(EventAction::ProtocolViolation)
                .with_agent(role.as_str())
                .with_details(json!({ "error": message })),
        );
        self.active_mut().push(
            Speaker::User,
            format!(
                "<protocol_error>{}</protocol_error>\nRespond again with exactly one valid tool call.",
                message
            ),
        );
        StepOutcome::Reprompt { message }
    }

    fn ensure_running(&self) -> Result<()> {
        let session = self.active();
        if session.state != SessionState::Running {
            return Err(KoduError::InvalidTransition(format!(
                "the {} session is {}",
                session.role, session.state
            )));
        }
        Ok(())
    }

    fn pop(&mut self) -> Result<SubAgentSession> {
        if self.sessions.len() < 2 {
            return Err(KoduError::InvalidTransition(
                "no sub-agent is active".to_string(),
            ));
        }
        self.sessions
            .pop()
            .ok_or_else(|| KoduError::InvalidTransition("no sub-agent is active".to_string()))
    }

    fn active_mut(&mut self) -> &mut SubAgentSession {
        let last = self.sessions.len() - 1;
        &mut self.sessions[last]
    }

    fn log(&self, action: EventAction, role: AgentRole, details: serde_json::Value) {
        events::record(
            Some(self.edits.editor.workspace()),
            Event::new(action)
                .with_tool("spawn_agent")
                .with_agent(role.as_str())
                .with_details(details),
        );
    }
}

fn response_result(response: &ToolResponse) -> String {
    match response {
        ToolResponse::Success { result, .. } => result.clone(),
        ToolResponse::Rejected { .. } | ToolResponse::Error { .. } => String::new(),
    }
}
