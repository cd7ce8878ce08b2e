//! Typed tool invocations.
//!
//! [`ToolCall`] is the closed union of everything a model may ask for. Every
//! consumer (rendering, dispatch, approval) matches on it exhaustively;
//! tools registered from configuration arrive as [`ToolCall::Custom`].

use crate::agent::AgentRole;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Names of the built-in tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    ReadFile,
    SearchFiles,
    ExecuteCommand,
    ListFiles,
    FileEditor,
    AskFollowupQuestion,
    SearchSymbol,
    UrlScreenshot,
    AttemptCompletion,
    ExploreRepoFolder,
    SpawnAgent,
    ServerRunner,
    AddInterestedFile,
    ExitAgent,
}

impl ToolName {
    pub const ALL: [ToolName; 14] = [
        ToolName::ReadFile,
        ToolName::SearchFiles,
        ToolName::ExecuteCommand,
        ToolName::ListFiles,
        ToolName::FileEditor,
        ToolName::AskFollowupQuestion,
        ToolName::SearchSymbol,
        ToolName::UrlScreenshot,
        ToolName::AttemptCompletion,
        ToolName::ExploreRepoFolder,
        ToolName::SpawnAgent,
        ToolName::ServerRunner,
        ToolName::AddInterestedFile,
        ToolName::ExitAgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::ReadFile => "read_file",
            ToolName::SearchFiles => "search_files",
            ToolName::ExecuteCommand => "execute_command",
            ToolName::ListFiles => "list_files",
            ToolName::FileEditor => "file_editor",
            ToolName::AskFollowupQuestion => "ask_followup_question",
            ToolName::SearchSymbol => "search_symbol",
            ToolName::UrlScreenshot => "url_screenshot",
            ToolName::AttemptCompletion => "attempt_completion",
            ToolName::ExploreRepoFolder => "explore_repo_folder",
            ToolName::SpawnAgent => "spawn_agent",
            ToolName::ServerRunner => "server_runner",
            ToolName::AddInterestedFile => "add_interested_file",
            ToolName::ExitAgent => "exit_agent",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL.into_iter().find(|t| t.as_str() == s).ok_or(())
    }
}

/// What a `file_editor` call does to its path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FileEditAction {
    WholeWrite {
        content: String,
        commit_message: String,
    },
    Edit {
        diff: String,
        commit_message: String,
    },
    Rollback,
    ListVersions,
}

impl FileEditAction {
    pub fn mode(&self) -> &'static str {
        match self {
            FileEditAction::WholeWrite { .. } => "whole_write",
            FileEditAction::Edit { .. } => "edit",
            FileEditAction::Rollback => "rollback",
            FileEditAction::ListVersions => "list_versions",
        }
    }
}

/// `server_runner` sub-commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServerCommand {
    Start,
    Stop,
    Restart,
    GetLogs,
}

impl FromStr for ServerCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(ServerCommand::Start),
            "stop" => Ok(ServerCommand::Stop),
            "restart" => Ok(ServerCommand::Restart),
            "getLogs" => Ok(ServerCommand::GetLogs),
            _ => Err(()),
        }
    }
}

/// A parsed tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolCall {
    ReadFile {
        path: String,
    },
    SearchFiles {
        path: String,
        regex: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_pattern: Option<String>,
    },
    ExecuteCommand {
        command: String,
    },
    ListFiles {
        path: String,
        #[serde(default)]
        recursive: bool,
    },
    FileEditor {
        path: String,
        edit: FileEditAction,
    },
    AskFollowupQuestion {
        question: String,
    },
    SearchSymbol {
        symbol_name: String,
        path: String,
    },
    UrlScreenshot {
        url: String,
    },
    AttemptCompletion {
        result: String,
    },
    ExploreRepoFolder {
        path: String,
    },
    SpawnAgent {
        agent: AgentRole,
        instructions: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        files: Vec<String>,
    },
    ServerRunner {
        command_type: ServerCommand,
        server_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        command_to_run: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lines: Option<u32>,
    },
    AddInterestedFile {
        path: String,
        why: String,
    },
    ExitAgent {
        result: String,
    },
    /// A tool registered from configuration.
    Custom {
        name: String,
        #[serde(default)]
        params: BTreeMap<String, String>,
    },
}

impl ToolCall {
    /// The built-in tool this call targets, or `None` for custom tools.
    pub fn tool_name(&self) -> Option<ToolName> {
        let name = match self {
            ToolCall::ReadFile { .. } => ToolName::ReadFile,
            ToolCall::SearchFiles { .. } => ToolName::SearchFiles,
            ToolCall::ExecuteCommand { .. } => ToolName::ExecuteCommand,
            ToolCall::ListFiles { .. } => ToolName::ListFiles,
            ToolCall::FileEditor { .. } => ToolName::FileEditor,
            ToolCall::AskFollowupQuestion { .. } => ToolName::AskFollowupQuestion,
            ToolCall::SearchSymbol { .. } => ToolName::SearchSymbol,
            ToolCall::UrlScreenshot { .. } => ToolName::UrlScreenshot,
            ToolCall::AttemptCompletion { .. } => ToolName::AttemptCompletion,
            ToolCall::ExploreRepoFolder { .. } => ToolName::ExploreRepoFolder,
            ToolCall::SpawnAgent { .. } => ToolName::SpawnAgent,
            ToolCall::ServerRunner { .. } => ToolName::ServerRunner,
            ToolCall::AddInterestedFile { .. } => ToolName::AddInterestedFile,
            ToolCall::ExitAgent { .. } => ToolName::ExitAgent,
            ToolCall::Custom { .. } => return None,
        };
        Some(name)
    }

    /// The wire name of the tool.
    pub fn name(&self) -> &str {
        match self {
            ToolCall::Custom { name, .. } => name,
            other => other.tool_name().map(|t| t.as_str()).unwrap_or_default(),
        }
    }

    /// The workspace path the call targets, when it has one.
    pub fn path(&self) -> Option<&str> {
        match self {
            ToolCall::ReadFile { path }
            | ToolCall::SearchFiles { path, .. }
            | ToolCall::ListFiles { path, .. }
            | ToolCall::FileEditor { path, .. }
            | ToolCall::SearchSymbol { path, .. }
            | ToolCall::ExploreRepoFolder { path }
            | ToolCall::AddInterestedFile { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// A tool invocation as shown to the rendering layer.
///
/// The snapshot is produced from a tracked invocation; `ts` is the
/// invocation's identity. `approval_state` is absent while the call has not
/// been surfaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTool {
    pub ts: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_feedback: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_sub_message: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub tool: ToolCall,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names_round_trip() {
        for name in ToolName::ALL {
            assert_eq!(name.as_str().parse::<ToolName>(), Ok(name));
        }
        assert!("write_to_file".parse::<ToolName>().is_err());
    }

    #[test]
    fn call_serializes_with_tool_tag() {
        let call = ToolCall::FileEditor {
            path: "src/lib.rs".to_string(),
            edit: FileEditAction::Rollback,
        };
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["tool"], "file_editor");
        assert_eq!(json["edit"]["mode"], "rollback");

        let back: ToolCall = serde_json::from_value(json).unwrap();
        assert_eq!(back, call);
    }

    #[test]
    fn name_and_path_accessors() {
        let call = ToolCall::SearchFiles {
            path: "src".to_string(),
            regex: "TODO".to_string(),
            file_pattern: None,
        };
        assert_eq!(call.name(), "search_files");
        assert_eq!(call.path(), Some("src"));

        let custom = ToolCall::Custom {
            name: "deploy".to_string(),
            params: BTreeMap::new(),
        };
        assert_eq!(custom.name(), "deploy");
        assert_eq!(custom.tool_name(), None);
        assert_eq!(custom.path(), None);
    }

    #[test]
    fn chat_tool_flattens_the_call() {
        let chat = ChatTool {
            ts: 42,
            approval_state: Some("rejected".to_string()),
            user_feedback: Some("use a smaller diff".to_string()),
            is_sub_message: false,
            error: None,
            tool: ToolCall::ReadFile {
                path: "a.rs".to_string(),
            },
        };
        let json = serde_json::to_value(&chat).unwrap();
        assert_eq!(json["tool"], "read_file");
        assert_eq!(json["path"], "a.rs");
        assert_eq!(json["approval_state"], "rejected");
        assert!(json.get("is_sub_message").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn server_command_wire_values() {
        assert_eq!("getLogs".parse::<ServerCommand>(), Ok(ServerCommand::GetLogs));
        assert!("logs".parse::<ServerCommand>().is_err());
        assert_eq!(
            serde_json::to_string(&ServerCommand::GetLogs).unwrap(),
            "\"getLogs\""
        );
    }
}
