//! The Tool Dispatcher.
//!
//! One dispatcher tracks the invocations of one agent session. At most one
//! invocation is outstanding at a time; it is surfaced, decided by the host,
//! executed, and then moved to the history.

use super::approval::{ApprovalEvent, ApprovalState};
use super::response::{DiffFixerRequest, ToolResponse};
use crate::agent::roles::{AgentRole, build_role_prompt};
use crate::config::Config;
use crate::context::{SystemInfo, WorkspaceContext};
use crate::diff::{EditOutcome, FileEditor, PatchFailure};
use crate::error::{KoduError, Result};
use crate::events::{self, Event, EventAction};
use crate::tools::{ChatTool, FileEditAction, ToolCall};
use chrono::Utc;
use serde_json::json;

/// The host's answer to a surfaced invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject { feedback: Option<String> },
}

/// The external collaborator that approves and executes tools.
///
/// `file_editor`, `spawn_agent` and `exit_agent` never reach `execute`; the
/// protocol layer runs them itself.
pub trait ToolHost {
    fn decide(&mut self, call: &ChatTool) -> Decision;

    /// Run a tool, returning its output or a failure message.
    fn execute(&mut self, call: &ToolCall) -> std::result::Result<String, String>;
}

/// State the protocol-run tools need: the sole file writer and what the
/// diff-fixer prompt is rendered from.
pub struct EditContext {
    pub editor: FileEditor,
    pub config: Config,
    pub system: SystemInfo,
}

impl EditContext {
    pub fn new(editor: FileEditor, config: Config, system: SystemInfo) -> Self {
        Self {
            editor,
            config,
            system,
        }
    }

    fn diff_fixer_request(
        &self,
        path: &str,
        diff: &str,
        failure: PatchFailure,
    ) -> Result<DiffFixerRequest> {
        let system_prompt = build_role_prompt(
            AgentRole::DiffFixer,
            &self.config,
            &self.system,
            None,
            Some(self.editor.workspace()),
        )?;
        Ok(DiffFixerRequest {
            path: path.to_string(),
            failed_diff: diff.to_string(),
            failure,
            latest_content: self.editor.read(path)?.unwrap_or_default(),
            system_prompt,
        })
    }
}

/// A tracked invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Creation time in milliseconds; unique within a dispatcher.
    pub ts: i64,
    pub call: ToolCall,
    pub state: ApprovalState,
    pub is_sub_message: bool,
}

impl Invocation {
    /// The snapshot handed to the rendering layer.
    pub fn chat_tool(&self) -> ChatTool {
        let (user_feedback, error) = match &self.state {
            ApprovalState::Rejected { feedback } => (feedback.clone(), None),
            ApprovalState::Error { message } => (None, Some(message.clone())),
            _ => (None, None),
        };
        ChatTool {
            ts: self.ts,
            approval_state: self.state.wire_status().map(str::to_string),
            user_feedback,
            is_sub_message: self.is_sub_message,
            error,
            tool: self.call.clone(),
        }
    }
}

/// What happened to a dispatched call.
#[derive(Debug, Clone)]
pub enum Dispatched {
    /// The invocation finished; `response` goes back to the model.
    Responded {
        response: ToolResponse,
        /// Set when a `file_editor` edit did not match.
        diff_fixer: Option<DiffFixerRequest>,
    },
    /// An approved `spawn_agent`. The invocation stays `loading` until the
    /// child exits.
    Spawn {
        agent: AgentRole,
        instructions: String,
        files: Vec<String>,
    },
    /// An approved `exit_agent`.
    Exit { result: String },
}

/// Tracks the invocations of one agent session.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    role: AgentRole,
    is_sub_agent: bool,
    active: Option<Invocation>,
    history: Vec<Invocation>,
    last_ts: i64,
    workspace: Option<WorkspaceContext>,
}

impl Dispatcher {
    pub fn new(role: AgentRole) -> Self {
        Self {
            role,
            is_sub_agent: false,
            active: None,
            history: Vec::new(),
            last_ts: 0,
            workspace: None,
        }
    }

    /// Mark invocations as belonging to a sub-agent.
    pub fn for_sub_agent(mut self) -> Self {
        self.is_sub_agent = true;
        self
    }

    /// Attach a workspace so transitions are logged.
    pub fn with_workspace(mut self, ctx: WorkspaceContext) -> Self {
        self.workspace = Some(ctx);
        self
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    pub fn active(&self) -> Option<&Invocation> {
        self.active.as_ref()
    }

    /// Finished invocations, oldest first.
    pub fn history(&self) -> &[Invocation] {
        &self.history
    }

    /// Track `call` and surface it (`undefined -> pending`).
    pub fn surface(&mut self, call: ToolCall) -> Result<&Invocation> {
        if let Some(active) = &self.active {
            return Err(KoduError::InvalidTransition(format!(
                "cannot surface '{}' while '{}' is still {}",
                call.name(),
                active.call.name(),
                active.state
            )));
        }
        if let ToolCall::SpawnAgent { agent, .. } = &call
            && !agent.is_spawnable()
        {
            return Err(KoduError::ProtocolViolation(format!(
                "spawn_agent cannot start a '{}' agent",
                agent
            )));
        }

        let ts = Utc::now().timestamp_millis().max(self.last_ts + 1);
        self.last_ts = ts;

        let mut invocation = Invocation {
            ts,
            call,
            state: ApprovalState::Undefined,
            is_sub_message: self.is_sub_agent,
        };
        invocation.state = invocation.state.transition(ApprovalEvent::Surface)?;
        self.log(EventAction::ToolSurfaced, &invocation, json!({ "ts": ts }));
        Ok(self.active.insert(invocation))
    }

    /// Record the host's decision on the pending invocation.
    ///
    /// A rejection finishes the invocation and returns its response.
    pub fn decide(&mut self, decision: Decision) -> Result<Option<ToolResponse>> {
        match decision {
            Decision::Approve => {
                self.advance(ApprovalEvent::Approve, EventAction::ToolApproved)?;
                Ok(None)
            }
            Decision::Reject { feedback } => {
                self.advance(
                    ApprovalEvent::Reject {
                        feedback: feedback.clone(),
                    },
                    EventAction::ToolRejected,
                )?;
                let tool = self.finish()?;
                Ok(Some(ToolResponse::Rejected { tool, feedback }))
            }
        }
    }

    /// Start executing the approved invocation (`approved -> loading`).
    pub fn begin(&mut self) -> Result<&ToolCall> {
        self.advance(ApprovalEvent::BeginExecution, EventAction::ToolExecuting)?;
        let active = self.require_active()?;
        Ok(&active.call)
    }

    /// Finish the executing invocation successfully.
    pub fn complete(&mut self, result: impl Into<String>) -> Result<ToolResponse> {
        self.advance(ApprovalEvent::Succeed, EventAction::ToolCompleted)?;
        let tool = self.finish()?;
        Ok(ToolResponse::Success {
            tool,
            result: result.into(),
        })
    }

    /// Finish the executing invocation with an execution error.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<ToolResponse> {
        let message = message.into();
        self.advance(
            ApprovalEvent::Fail {
                message: message.clone(),
            },
            EventAction::ToolFailed,
        )?;
        let tool = self.finish()?;
        Ok(ToolResponse::Error { tool, message })
    }

    /// Abandon the outstanding invocation, if any.
    pub fn abandon(&mut self) -> Result<Option<ToolResponse>> {
        let Some(active) = &self.active else {
            return Ok(None);
        };
        let state = active.state.transition(ApprovalEvent::Abandon)?;
        let response = match &state {
            ApprovalState::Rejected { feedback } => ToolResponse::Rejected {
                tool: active.call.name().to_string(),
                feedback: feedback.clone(),
            },
            ApprovalState::Error { message } => ToolResponse::Error {
                tool: active.call.name().to_string(),
                message: message.clone(),
            },
            _ => {
                return Err(KoduError::InvalidTransition(format!(
                    "abandoning '{}' left it {}",
                    active.call.name(),
                    state
                )));
            }
        };

        let from = active.state.name();
        self.set_state(state)?;
        if let Some(active) = &self.active {
            self.log(EventAction::ToolAbandoned, active, json!({ "from": from }));
        }
        self.finish()?;
        Ok(Some(response))
    }

    /// Surface `call`, ask the host, and run it when approved.
    pub fn dispatch(
        &mut self,
        call: ToolCall,
        host: &mut dyn ToolHost,
        edits: &mut EditContext,
    ) -> Result<Dispatched> {
        let snapshot = self.surface(call)?.chat_tool();

        if let Some(response) = self.decide(host.decide(&snapshot))? {
            return Ok(Dispatched::Responded {
                response,
                diff_fixer: None,
            });
        }

        let call = self.begin()?.clone();
        match call {
            ToolCall::SpawnAgent {
                agent,
                instructions,
                files,
            } => Ok(Dispatched::Spawn {
                agent,
                instructions,
                files,
            }),
            ToolCall::ExitAgent { result } => {
                self.complete(result.clone())?;
                Ok(Dispatched::Exit { result })
            }
            ToolCall::FileEditor { path, edit } => self.run_file_editor(&path, &edit, edits),
            other => {
                let response = match host.execute(&other) {
                    Ok(output) => self.complete(output)?,
                    Err(message) => self.fail(message)?,
                };
                Ok(Dispatched::Responded {
                    response,
                    diff_fixer: None,
                })
            }
        }
    }

    fn run_file_editor(
        &mut self,
        path: &str,
        edit: &FileEditAction,
        edits: &mut EditContext,
    ) -> Result<Dispatched> {
        match edits.editor.apply(path, edit) {
            Ok(EditOutcome::Applied(report)) => Ok(Dispatched::Responded {
                response: self.complete(report.response_text())?,
                diff_fixer: None,
            }),
            Ok(EditOutcome::Mismatch(failure)) => {
                let report = failure.report();
                let diff = match edit {
                    FileEditAction::Edit { diff, .. } => diff.as_str(),
                    _ => "",
                };
                let response = self.fail(report)?;
                let diff_fixer = match edits.diff_fixer_request(path, diff, failure) {
                    Ok(request) => Some(request),
                    Err(e) => {
                        eprintln!("Warning: no diff fixer request for '{}': {}", path, e);
                        None
                    }
                };
                Ok(Dispatched::Responded {
                    response,
                    diff_fixer,
                })
            }
            Err(e) => Ok(Dispatched::Responded {
                response: self.fail(e.to_string())?,
                diff_fixer: None,
            }),
        }
    }

    fn require_active(&self) -> Result<&Invocation> {
        self.active.as_ref().ok_or_else(|| {
            KoduError::InvalidTransition("no tool call is outstanding".to_string())
        })
    }

    fn advance(&mut self, event: ApprovalEvent, action: EventAction) -> Result<()> {
        let next = self.require_active()?.state.transition(event)?;
        self.set_state(next)?;
        if let Some(active) = &self.active {
            let details = match &active.state {
                ApprovalState::Rejected {
                    feedback: Some(feedback),
                } => json!({ "ts": active.ts, "feedback": feedback }),
                ApprovalState::Error { message } => json!({ "ts": active.ts, "error": message }),
                _ => json!({ "ts": active.ts }),
            };
            self.log(action, active, details);
        }
        Ok(())
    }

    fn set_state(&mut self, state: ApprovalState) -> Result<()> {
        let active = self.active.as_mut().ok_or_else(|| {
            KoduError::InvalidTransition("no tool call is outstanding".to_string())
        })?;
        active.state = state;
        Ok(())
    }

    /// Move the terminal active invocation to the history, returning its name.
    fn finish(&mut self) -> Result<String> {
        let invocation = self.active.take().ok_or_else(|| {
            KoduError::InvalidTransition("no tool call is outstanding".to_string())
        })?;
        let name = invocation.call.name().to_string();
        self.history.push(invocation);
        Ok(name)
    }

    fn log(&self, action: EventAction, invocation: &Invocation, details: serde_json::Value) {
        let mut event = Event::new(action)
            .with_tool(invocation.call.name())
            .with_agent(self.role.as_str())
            .with_details(details);
        if let Some(path) = invocation.call.path() {
            event = event.with_path(path);
        }
        events::record(self.workspace.as_ref(), event);
    }
}
