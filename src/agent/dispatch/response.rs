//! What the model sees after a tool call.

use crate::diff::PatchFailure;
use serde::Serialize;

/// Outcome of one invocation, fed back into the conversation.
///
/// The three statuses stay distinguishable: a rejection is the user's
/// decision, an error is an execution failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResponse {
    Success {
        tool: String,
        result: String,
    },
    Rejected {
        tool: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        feedback: Option<String>,
    },
    Error {
        tool: String,
        message: String,
    },
}

impl ToolResponse {
    pub fn status(&self) -> &'static str {
        match self {
            ToolResponse::Success { .. } => "success",
            ToolResponse::Rejected { .. } => "rejected",
            ToolResponse::Error { .. } => "error",
        }
    }

    pub fn tool(&self) -> &str {
        match self {
            ToolResponse::Success { tool, .. }
            | ToolResponse::Rejected { tool, .. }
            | ToolResponse::Error { tool, .. } => tool,
        }
    }

    /// The `<toolResponse>` message appended to the conversation.
    pub fn to_message(&self) -> String {
        let body = match self {
            ToolResponse::Success { result, .. } => result.clone(),
            ToolResponse::Rejected {
                feedback: Some(feedback),
                ..
            } => format!(
                "The user denied this operation and provided the following feedback:\n<user_feedback>{}</user_feedback>",
                feedback
            ),
            ToolResponse::Rejected { feedback: None, .. } => {
                "The user denied this operation.".to_string()
            }
            ToolResponse::Error { message, .. } => format!("Error: {}", message),
        };
        format!(
            "<toolResponse>\n<toolName>{}</toolName>\n<toolStatus>{}</toolStatus>\n<toolResult>{}</toolResult>\n</toolResponse>",
            self.tool(),
            self.status(),
            body
        )
    }
}

/// Everything the diff-fixer role needs to repair a failed `edit`.
#[derive(Debug, Clone)]
pub struct DiffFixerRequest {
    pub path: String,
    pub failed_diff: String,
    pub failure: PatchFailure,
    /// File content at the time of the failure.
    pub latest_content: String,
    pub(crate) system_prompt: String,
}

impl DiffFixerRequest {
    /// The `diff_fixer` role's rendered system prompt.
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// The repair request sent as the diff fixer's first user message.
    pub fn user_message(&self) -> String {
        format!(
            "The following kodu_diff for '{path}' failed to apply.\n\n\
             <failure_report>\n{report}</failure_report>\n\n\
             <failed_diff>\n{diff}\n</failed_diff>\n\n\
             <latest_content path=\"{path}\">\n{content}\n</latest_content>\n\n\
             Re-emit every block against the latest content with a single file_editor call in edit mode.",
            path = self.path,
            report = self.failure.report(),
            diff = self.failed_diff.trim_end(),
            content = self.latest_content.trim_end(),
        )
    }
}
