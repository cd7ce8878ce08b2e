//! The five agent roles.
//!
//! A role is a template plus a subset of the tool registry. Roles other than
//! `main` and `diff_fixer` run as sub-agents and hand their result back with
//! `exit_agent`.

use super::prompt::{Placeholder, PromptBuilder, PromptConfig};
use crate::config::Config;
use crate::context::{SystemInfo, WorkspaceContext};
use crate::error::{KoduError, Result};
use crate::tools::{ToolName, ToolPromptSchema, ToolRegistry, definition};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Agent role selected by name (`main`, `planner`, `sub_task`,
/// `print_debugger`, `diff_fixer`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Main,
    Planner,
    SubTask,
    PrintDebugger,
    DiffFixer,
}

impl AgentRole {
    pub const ALL: [AgentRole; 5] = [
        AgentRole::Main,
        AgentRole::Planner,
        AgentRole::SubTask,
        AgentRole::PrintDebugger,
        AgentRole::DiffFixer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Main => "main",
            AgentRole::Planner => "planner",
            AgentRole::SubTask => "sub_task",
            AgentRole::PrintDebugger => "print_debugger",
            AgentRole::DiffFixer => "diff_fixer",
        }
    }

    /// Whether `spawn_agent` may name this role.
    pub fn is_spawnable(&self) -> bool {
        matches!(
            self,
            AgentRole::Planner | AgentRole::SubTask | AgentRole::PrintDebugger
        )
    }

    /// The name the agent calls itself. Sub-agents have fixed names; the
    /// other roles use the configured one.
    pub fn agent_name(&self, configured: &str) -> String {
        match self {
            AgentRole::Main | AgentRole::DiffFixer => configured.to_string(),
            AgentRole::Planner => "PlannerAgent".to_string(),
            AgentRole::SubTask => "SubTaskAgent".to_string(),
            AgentRole::PrintDebugger => "PrintDebuggerAgent".to_string(),
        }
    }

    /// Built-in tools available to the role, in registration order.
    pub fn tool_names(&self) -> Vec<ToolName> {
        use ToolName::*;

        let defaults = ToolName::ALL.into_iter().filter(|t| *t != ExitAgent);
        match self {
            AgentRole::Main => defaults.collect(),
            AgentRole::Planner => defaults
                .filter(|t| !matches!(t, SpawnAgent | AttemptCompletion))
                .chain([ExitAgent])
                .collect(),
            AgentRole::SubTask => defaults
                .filter(|t| {
                    !matches!(
                        t,
                        SpawnAgent | AttemptCompletion | AddInterestedFile | ServerRunner
                    )
                })
                .chain([ExitAgent])
                .collect(),
            AgentRole::PrintDebugger => vec![
                ExploreRepoFolder,
                ReadFile,
                ExecuteCommand,
                AskFollowupQuestion,
                ListFiles,
                SearchFiles,
                SearchSymbol,
                FileEditor,
                ExitAgent,
            ],
            AgentRole::DiffFixer => vec![FileEditor],
        }
    }

    /// Whether configured custom tools are offered to the role.
    pub fn accepts_custom_tools(&self) -> bool {
        *self != AgentRole::DiffFixer
    }

    /// The built-in template for the role.
    pub fn default_template(&self) -> String {
        let sections: Vec<&str> = match self {
            AgentRole::Main => vec![MAIN_INTRO, TOOL_USE, CAPABILITIES, MAIN_RULES, SYSTEM_INFO, MAIN_OBJECTIVE],
            AgentRole::Planner => vec![PLANNER_INTRO, TOOL_USE, CAPABILITIES, PLANNER_RULES, SYSTEM_INFO, PLANNER_OBJECTIVE],
            AgentRole::SubTask => vec![SUB_TASK_INTRO, TOOL_USE, CAPABILITIES, SUB_TASK_RULES, SYSTEM_INFO, SUB_TASK_OBJECTIVE],
            AgentRole::PrintDebugger => vec![DEBUGGER_INTRO, TOOL_USE, CAPABILITIES, DEBUGGER_RULES, SYSTEM_INFO, DEBUGGER_OBJECTIVE],
            AgentRole::DiffFixer => vec![DIFF_FIXER_INTRO, DIFF_FIXER_TOOLS, DIFF_FIXER_RULES, SYSTEM_INFO],
        };
        sections.join(SECTION_BREAK)
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = KoduError;

    fn from_str(s: &str) -> Result<Self> {
        AgentRole::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| {
                KoduError::UserError(format!(
                    "unknown agent role '{}' (expected one of: main, planner, sub_task, print_debugger, diff_fixer)",
                    s
                ))
            })
    }
}

/// Construct the Prompt Builder for `role`.
///
/// The template comes from `prompt_templates` when the config overrides it.
/// Custom tools follow the role's built-in tools, and `disabled_tools`
/// applies to both.
pub fn role_builder(role: AgentRole, config: &Config, system: &SystemInfo) -> Result<PromptBuilder> {
    let template = match config.prompt_templates.get(&role) {
        Some(source) => source.clone(),
        None => role.default_template(),
    };
    let prompt_config = PromptConfig::new(
        role.agent_name(&config.agent_name),
        system,
        &template,
        config.features.clone(),
    )?;

    let registry = role_registry(role, config)?;
    let mut builder = PromptBuilder::new(prompt_config).with_label(role.as_str());
    builder.add_tools(registry.iter().cloned())?;
    Ok(builder)
}

/// The role's tool registry after feature gating and `disabled_tools`.
pub fn role_registry(role: AgentRole, config: &Config) -> Result<ToolRegistry> {
    let mut tools: Vec<ToolPromptSchema> = role.tool_names().into_iter().map(definition).collect();
    if role.accepts_custom_tools() {
        tools.extend(config.custom_tools.iter().cloned());
    }

    let mut registry = ToolRegistry::new(config.features.clone());
    registry.add_tools(tools)?;
    Ok(registry.without_disabled(&config.disabled_tools_matcher()?))
}

/// Render the system prompt for `role`, optionally with a task and an
/// attached workspace for event logging.
pub fn build_role_prompt(
    role: AgentRole,
    config: &Config,
    system: &SystemInfo,
    task: Option<&str>,
    workspace: Option<&WorkspaceContext>,
) -> Result<String> {
    let mut builder = role_builder(role, config, system)?;
    if let Some(task) = task {
        builder.add_section(Placeholder::Task, task);
    }
    if let Some(ctx) = workspace {
        builder = builder.with_workspace(ctx.clone());
    }
    Ok(builder.build(config.build_options()))
}

const SECTION_BREAK: &str = "\n\n====\n\n";

const MAIN_INTRO: &str = "You are {{agentName}}, a highly skilled software developer with extensive knowledge in many programming languages, frameworks, design patterns, and best practices.
You work through a task one tool call at a time, observing each result before deciding the next step.
You explore the repository first, keep track of the files that matter with add_interested_file, and make precise, minimal changes.";

const PLANNER_INTRO: &str = "You are {{agentName}}, a Planning Agent specialized in analyzing tasks and creating detailed execution plans.
You research the codebase thoroughly, map the relationships between files, and identify risks and dependencies before any implementation begins.
You never implement the plan yourself and you do not hold a back and forth conversation with the user.";

const SUB_TASK_INTRO: &str = "You are {{agentName}}, a Sub-Task Agent specialized in efficiently executing one specific part of a larger task.
You gather only the context your sub-task needs and make precise, targeted changes that integrate with the rest of the codebase.
You stay inside the scope of your sub-task and never start unrelated work.";

const DEBUGGER_INTRO: &str = "You are {{agentName}}, a Print Debugging Agent specialized in finding the root cause of bugs.
You add temporary print statements, run the program, read the output, and narrow the fault down until you can name the exact line responsible.
You remove every temporary print statement before you exit.";

const DIFF_FIXER_INTRO: &str = "Your goal is to take the search and replace blocks that failed to apply and re-derive them against the latest file content, keeping the intended changes.
The blocks failed because of missing content, an incorrect HEAD section, or stale context.
Output the entire corrected set of blocks in a single file_editor call.";

const TOOL_USE: &str = "TOOL USE

You have access to a set of tools that are executed upon the user's approval. You can use one tool per message, and will receive the result of that tool use in the user's response. Each tool use is informed by the result of the previous one.

# Tool Use Formatting

Tool use is formatted using XML-style tags. The tool name is enclosed in opening and closing tags, and each parameter is similarly enclosed within its own set of tags:

<tool_name>
<parameter1_name>value1</parameter1_name>
<parameter2_name>value2</parameter2_name>
</tool_name>

Always adhere to this format. A response must contain at most one tool call.

# Available Tools

{{toolSection}}";

const CAPABILITIES: &str = "CAPABILITIES

You can run CLI commands on the user's computer, list and search files, read and edit files, and more. When the user gives you a task, a recursive list of the file paths in the current working directory ('{{cwd}}') is included in environment_details.
{{capabilitiesSection}}";

const MAIN_RULES: &str = "RULES

- Tool calling is sequential: use one tool per message and wait for its result before the next one.
- Your current working directory is: {{cwd}}. You cannot cd into another directory, so pass correct paths to tools.
- Always read a file again after editing it; never edit from a stale copy.
- Use attempt_completion once the task is done, and do not end the result with a question.
{{#vision}}- When presented with images, use your vision capabilities to examine them thoroughly and use what you find.
{{/vision}}{{rulesSection}}";

const PLANNER_RULES: &str = "RULES

- Tool calling is sequential: use one tool per message and wait for its result before the next one.
- Your current working directory is: {{cwd}}.
- Do not modify files; research and plan only.
- Use exit_agent with the complete plan when planning is finished.
{{#vision}}- When presented with images, use your vision capabilities to examine them thoroughly and use what you find.
{{/vision}}{{rulesSection}}";

const SUB_TASK_RULES: &str = "RULES

- Tool calling is sequential: use one tool per message and wait for its result before the next one.
- Your current working directory is: {{cwd}}. You cannot cd into another directory.
- Stay focused on your sub-task and make minimal, precise changes.
- Use exit_agent when the sub-task is complete.
{{#vision}}- When presented with images, use your vision capabilities to examine them thoroughly and use what you find.
{{/vision}}{{rulesSection}}";

const DEBUGGER_RULES: &str = "RULES

- Tool calling is sequential: use one tool per message and wait for its result before the next one.
- Your current working directory is: {{cwd}}.
- Only add print statements and temporary scaffolding; do not fix the bug.
- Use exit_agent with the root cause, the evidence, and the affected lines.
{{rulesSection}}";

const DIFF_FIXER_TOOLS: &str = "TOOL USE

Tool use is formatted using XML-style tags, one tool call per message:

<tool_name>
<parameter1_name>value1</parameter1_name>
</tool_name>

{{toolSection}}";

const DIFF_FIXER_RULES: &str = "RULES

1. Identify the block of code in the latest content that each failed block meant to replace.
2. Copy the HEAD section of every block character for character from the latest content.
3. Keep the blocks in the order they appear in the file.
4. Output every corrected block together in one edit.";

const SYSTEM_INFO: &str = "SYSTEM INFORMATION

Operating System: {{osName}}
Default Shell: {{defaultShell}}
Home Directory: {{homeDir}}
Current Working Directory: {{cwd}}";

const MAIN_OBJECTIVE: &str = "OBJECTIVE

1. Analyze the task and set clear, achievable goals in a logical order.
2. Work through the goals one tool call at a time.
3. Present the result with attempt_completion.

{{task}}";

const PLANNER_OBJECTIVE: &str = "OBJECTIVE

Produce an ordered plan of sub-tasks, each with the files it touches and how to verify it.

{{task}}";

const SUB_TASK_OBJECTIVE: &str = "OBJECTIVE

1. Understand the scope of your sub-task.
2. Identify the minimal set of files involved.
3. Make and verify the change.
4. Report back with exit_agent.

{{task}}";

const DEBUGGER_OBJECTIVE: &str = "OBJECTIVE

Locate the root cause with print debugging and report it with exit_agent.

{{task}}";
