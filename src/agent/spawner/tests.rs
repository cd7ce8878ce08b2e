//! Tests for the sub-agent spawner.

use super::*;
use crate::agent::dispatch::{ApprovalState, Decision, EditContext, ToolHost};
use crate::config::{Config, DiffSettings};
use crate::context::{SystemInfo, WorkspaceContext};
use crate::diff::FileEditor;
use crate::events::read_events;
use crate::tools::ChatTool;
use tempfile::TempDir;

/// Approves everything and echoes the tool name.
#[derive(Default)]
struct EchoHost {
    executed: Vec<String>,
    surfaced: Vec<ChatTool>,
}

impl ToolHost for EchoHost {
    fn decide(&mut self, call: &ChatTool) -> Decision {
        self.surfaced.push(call.clone());
        Decision::Approve
    }

    fn execute(&mut self, call: &ToolCall) -> std::result::Result<String, String> {
        self.executed.push(call.name().to_string());
        Ok(format!("{} ok", call.name()))
    }
}

fn conversation(temp_dir: &TempDir) -> Conversation {
    let ctx = WorkspaceContext::at(temp_dir.path());
    let editor = FileEditor::open(ctx, DiffSettings::default()).unwrap();
    let system = SystemInfo {
        os_name: "Linux".to_string(),
        default_shell: "/bin/bash".to_string(),
        home_dir: "/home/dev".to_string(),
        cwd: "/home/dev/project".to_string(),
    };
    let edits = EditContext::new(editor, Config::default(), system);
    Conversation::new(AgentRole::Main, "Make the build green.", edits).unwrap()
}

const SPAWN_SUB_TASK: &str = "<spawn_agent>\n<agentName>sub_task</agentName>\n<instructions>Fix the failing parser test.</instructions>\n<files>src/parser.rs</files>\n</spawn_agent>";

#[test]
fn test_root_session_starts_with_task() {
    let temp_dir = TempDir::new().unwrap();
    let conversation = conversation(&temp_dir);

    assert_eq!(conversation.depth(), 0);
    let root = conversation.root();
    assert_eq!(root.role, AgentRole::Main);
    assert_eq!(root.state, SessionState::Running);
    assert_eq!(root.history.len(), 1);
    assert_eq!(root.history[0].content, "<task>\nMake the build green.\n</task>");
    assert!(root.system_prompt.contains("# spawn_agent"));
}

#[test]
fn test_spawned_sub_task_gets_restricted_prompt() {
    let temp_dir = TempDir::new().unwrap();
    let mut conversation = conversation(&temp_dir);
    let mut host = EchoHost::default();

    let outcome = conversation.step(SPAWN_SUB_TASK, &mut host).unwrap();
    assert!(matches!(
        outcome,
        StepOutcome::SubAgentStarted {
            role: AgentRole::SubTask,
            depth: 1
        }
    ));

    let child = conversation.active();
    assert_eq!(child.role, AgentRole::SubTask);
    assert_eq!(child.name, "SubTaskAgent");
    for excluded in ["spawn_agent", "attempt_completion", "add_interested_file", "server_runner"] {
        assert!(
            !child.system_prompt.contains(&format!("\n# {}\n", excluded)),
            "{} leaked into the sub_task prompt",
            excluded
        );
    }
    assert!(child.system_prompt.contains("\n# exit_agent\n"));
    assert_eq!(
        child.history[0].content,
        "<task>\nFix the failing parser test.\n</task>\n<interested_files>\n- src/parser.rs\n</interested_files>"
    );

    // The parent's spawn_agent call is suspended.
    let parent_call = conversation.root().dispatcher().active().unwrap();
    assert_eq!(parent_call.state, ApprovalState::Loading);
}

#[test]
fn test_exit_resolves_parent_spawn_call() {
    let temp_dir = TempDir::new().unwrap();
    let mut conversation = conversation(&temp_dir);
    let mut host = EchoHost::default();

    conversation.step(SPAWN_SUB_TASK, &mut host).unwrap();
    conversation
        .step("<read_file><path>src/parser.rs</path></read_file>", &mut host)
        .unwrap();
    let outcome = conversation
        .step("<exit_agent><result>Parser test fixed.</result></exit_agent>", &mut host)
        .unwrap();

    let StepOutcome::SubAgentFinished {
        role,
        result,
        response,
    } = outcome
    else {
        panic!("expected the sub-agent to finish");
    };
    assert_eq!(role, AgentRole::SubTask);
    assert_eq!(result, "Parser test fixed.");
    assert_eq!(
        response,
        ToolResponse::Success {
            tool: "spawn_agent".to_string(),
            result: "Parser test fixed.".to_string()
        }
    );

    assert_eq!(conversation.depth(), 0);
    assert!(conversation.root().dispatcher().active().is_none());
    let last = conversation.root().history.last().unwrap();
    assert!(last.content.contains("<toolName>spawn_agent</toolName>"));
    assert!(last.content.contains("Parser test fixed."));

    let finished = &conversation.finished()[0];
    assert_eq!(finished.state, SessionState::Done);
    assert_eq!(finished.result.as_deref(), Some("Parser test fixed."));
    assert!(host.surfaced.iter().any(|c| c.is_sub_message));
    assert_eq!(host.executed, vec!["read_file"]);
}

#[test]
fn test_exit_agent_at_root_is_reprompted() {
    let temp_dir = TempDir::new().unwrap();
    let mut conversation = conversation(&temp_dir);
    let mut host = EchoHost::default();

    let outcome = conversation
        .step("<exit_agent><result>done</result></exit_agent>", &mut host)
        .unwrap();

    assert!(matches!(outcome, StepOutcome::Reprompt { .. }));
    assert!(host.surfaced.is_empty());
    let last = conversation.root().history.last().unwrap();
    assert!(last.content.starts_with("<protocol_error>"));
}

#[test]
fn test_spawning_main_is_reprompted() {
    let temp_dir = TempDir::new().unwrap();
    let mut conversation = conversation(&temp_dir);
    let mut host = EchoHost::default();

    let outcome = conversation
        .step(
            "<spawn_agent><agentName>main</agentName><instructions>x</instructions></spawn_agent>",
            &mut host,
        )
        .unwrap();

    let StepOutcome::Reprompt { message } = outcome else {
        panic!("expected a reprompt");
    };
    assert!(message.contains("cannot start a 'main' agent"));
    assert_eq!(conversation.depth(), 0);

    let events = read_events(conversation.edits().editor.workspace()).unwrap();
    assert!(
        events
            .iter()
            .any(|e| e.action == EventAction::ProtocolViolation)
    );
}

#[test]
fn test_two_calls_in_one_turn_are_reprompted() {
    let temp_dir = TempDir::new().unwrap();
    let mut conversation = conversation(&temp_dir);
    let mut host = EchoHost::default();

    let outcome = conversation
        .step(
            "<read_file><path>a</path></read_file><read_file><path>b</path></read_file>",
            &mut host,
        )
        .unwrap();

    assert!(matches!(outcome, StepOutcome::Reprompt { .. }));
    assert!(host.executed.is_empty());
}

#[test]
fn test_plain_text_has_no_tool_call() {
    let temp_dir = TempDir::new().unwrap();
    let mut conversation = conversation(&temp_dir);
    let mut host = EchoHost::default();

    let outcome = conversation.step("Thinking it over.", &mut host).unwrap();
    assert!(matches!(outcome, StepOutcome::NoToolCall));
    assert_eq!(conversation.root().history.len(), 2);
}

#[test]
fn test_abort_fails_parent_spawn_call() {
    let temp_dir = TempDir::new().unwrap();
    let mut conversation = conversation(&temp_dir);
    let mut host = EchoHost::default();

    conversation.step(SPAWN_SUB_TASK, &mut host).unwrap();
    let response = conversation.abort().unwrap().unwrap();

    assert_eq!(
        response,
        ToolResponse::Error {
            tool: "spawn_agent".to_string(),
            message: "the sub_task sub-agent was aborted".to_string()
        }
    );
    assert_eq!(conversation.depth(), 0);
    assert_eq!(conversation.finished()[0].state, SessionState::Aborted);
    assert!(conversation.root().dispatcher().active().is_none());
}

#[test]
fn test_abort_at_root_without_outstanding_call() {
    let temp_dir = TempDir::new().unwrap();
    let mut conversation = conversation(&temp_dir);

    assert_eq!(conversation.abort().unwrap(), None);
}

#[test]
fn test_completion_finishes_root() {
    let temp_dir = TempDir::new().unwrap();
    let mut conversation = conversation(&temp_dir);
    let mut host = EchoHost::default();

    let outcome = conversation
        .step(
            "<attempt_completion><result>All green.</result></attempt_completion>",
            &mut host,
        )
        .unwrap();

    let StepOutcome::Completed { result } = outcome else {
        panic!("expected completion");
    };
    assert_eq!(result, "attempt_completion ok");
    assert_eq!(conversation.root().state, SessionState::Done);

    let err = conversation.step("more", &mut host).unwrap_err();
    assert!(matches!(err, KoduError::InvalidTransition(_)));
}

#[test]
fn test_spawn_and_exit_are_logged() {
    let temp_dir = TempDir::new().unwrap();
    let mut conversation = conversation(&temp_dir);
    let mut host = EchoHost::default();

    conversation.step(SPAWN_SUB_TASK, &mut host).unwrap();
    conversation
        .step("<exit_agent><result>ok</result></exit_agent>", &mut host)
        .unwrap();

    let events = read_events(conversation.edits().editor.workspace()).unwrap();
    let spawned = events
        .iter()
        .find(|e| e.action == EventAction::SubAgentSpawned)
        .unwrap();
    assert_eq!(spawned.agent.as_deref(), Some("sub_task"));
    assert_eq!(spawned.details["depth"], 1);

    let exited = events
        .iter()
        .find(|e| e.action == EventAction::SubAgentExited)
        .unwrap();
    assert_eq!(exited.details["state"], "DONE");
}
