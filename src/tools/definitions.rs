//! Built-in tool schemas.
//!
//! Descriptions must not contain template tags: they are substituted into
//! `{{toolSection}}` and substituted values are never rescanned.

use super::call::ToolName;
use super::schema::{Requirement, ToolPromptSchema};
use crate::agent::prompt::ConditionalBlock;
use crate::diff::MAX_DIFF_BLOCKS;

use Requirement::{Conditional, Optional, Required};

/// Render an invocation in the wire format.
pub fn invocation(tool: ToolName, params: &[(&str, &str)]) -> String {
    let mut out = format!("<{}>\n", tool);
    for (name, value) in params {
        out.push_str(&format!("<{0}>{1}</{0}>\n", name, value));
    }
    out.push_str(&format!("</{}>", tool));
    out
}

/// The default tool set, in registration order. `exit_agent` is not part of
/// it; sub-agent roles add it explicitly.
pub fn default_tools() -> Vec<ToolPromptSchema> {
    vec![
        read_file(),
        search_files(),
        execute_command(),
        list_files(),
        file_editor(),
        ask_followup_question(),
        search_symbol(),
        url_screenshot(),
        attempt_completion(),
        explore_repo_folder(),
        spawn_agent(),
        server_runner(),
        add_interested_file(),
    ]
}

/// Schema for a built-in tool by name.
pub fn definition(tool: ToolName) -> ToolPromptSchema {
    match tool {
        ToolName::ReadFile => read_file(),
        ToolName::SearchFiles => search_files(),
        ToolName::ExecuteCommand => execute_command(),
        ToolName::ListFiles => list_files(),
        ToolName::FileEditor => file_editor(),
        ToolName::AskFollowupQuestion => ask_followup_question(),
        ToolName::SearchSymbol => search_symbol(),
        ToolName::UrlScreenshot => url_screenshot(),
        ToolName::AttemptCompletion => attempt_completion(),
        ToolName::ExploreRepoFolder => explore_repo_folder(),
        ToolName::SpawnAgent => spawn_agent(),
        ToolName::ServerRunner => server_runner(),
        ToolName::AddInterestedFile => add_interested_file(),
        ToolName::ExitAgent => exit_agent(),
    }
}

pub fn read_file() -> ToolPromptSchema {
    let tool = ToolName::ReadFile;
    ToolPromptSchema::new(
        tool.as_str(),
        "Read the contents of a file at the given path. Use it to examine a file whose \
         contents you do not know yet, such as source code, text files or configuration. \
         Always read a file again after editing it before making another edit.",
    )
    .param(
        "path",
        Required,
        "The path of the file to read, relative to the workspace root.",
    )
    .capability(
        "You can use read_file to examine source code, configuration and text files before \
         reasoning about or changing them.",
    )
    .example(
        "Read the crate manifest",
        invocation(tool, &[("path", "Cargo.toml")]),
    )
    .example(
        "Read a source file",
        invocation(tool, &[("path", "src/main.rs")]),
    )
}

pub fn search_files() -> ToolPromptSchema {
    let tool = ToolName::SearchFiles;
    ToolPromptSchema::new(
        tool.as_str(),
        "Run a regex search across the files of a directory and return every match with \
         surrounding context lines.",
    )
    .param(
        "path",
        Required,
        "The directory to search, relative to the workspace root. It is searched recursively.",
    )
    .param(
        "regex",
        Required,
        "The regular expression to search for, in Rust regex syntax.",
    )
    .param(
        "filePattern",
        Optional,
        "Glob pattern restricting which files are searched (e.g. '*.rs'). Defaults to all files.",
    )
    .capability(
        "You can use search_files to find code patterns, implementations, TODO comments or any \
         text across the project, with context around each match.",
    )
    .example(
        "Find every TODO in Rust sources",
        invocation(
            tool,
            &[("path", "src"), ("regex", "TODO"), ("filePattern", "*.rs")],
        ),
    )
}

pub fn execute_command() -> ToolPromptSchema {
    let tool = ToolName::ExecuteCommand;
    ToolPromptSchema::new(
        tool.as_str(),
        "Execute a CLI command on the user's system from the workspace root. Tailor the \
         command to the user's operating system and shell. Do not start long-running servers \
         with this tool; use server_runner for that.",
    )
    .param(
        "command",
        Required,
        "The command line to execute. It must be valid for the current operating system and \
         must not contain harmful instructions.",
    )
    .capability(
        "You can use execute_command to install packages, run builds and tests, and perform \
         file system operations such as creating directories or removing files.",
    )
    .example(
        "Run the test suite",
        invocation(tool, &[("command", "cargo test")]),
    )
    .example(
        "Create a directory",
        invocation(tool, &[("command", "mkdir -p src/agent")]),
    )
}

pub fn list_files() -> ToolPromptSchema {
    let tool = ToolName::ListFiles;
    ToolPromptSchema::new(
        tool.as_str(),
        "List files and directories inside a directory, either only the top level or \
         recursively. Do not use it to confirm that a file you wrote exists; the tool \
         response already tells you.",
    )
    .param(
        "path",
        Required,
        "The directory to list, relative to the workspace root.",
    )
    .param(
        "recursive",
        Optional,
        "'true' to list recursively, 'false' or omitted for the top level only.",
    )
    .capability(
        "You can use list_files to understand the layout of a directory or the structure of a \
         project.",
    )
    .example(
        "List the source tree recursively",
        invocation(tool, &[("path", "src"), ("recursive", "true")]),
    )
}

pub fn file_editor() -> ToolPromptSchema {
    let tool = ToolName::FileEditor;
    let diff_description = format!(
        "The precise change to apply in \"edit\" mode, written as git conflict blocks:\n\
         <<<<<<< HEAD\n\
         (the exact current lines, with at least 3 lines of unchanged context)\n\
         =======\n\
         (the final replacement lines, no placeholders)\n\
         >>>>>>> updated\n\
         Up to {} blocks may be given, ordered from the top of the file to the bottom. \
         The HEAD part must match the file character for character, including whitespace \
         and indentation.",
        MAX_DIFF_BLOCKS
    );

    ToolPromptSchema::new(
        tool.as_str(),
        "Create, rewrite, edit or roll back a file. \"edit\" applies precise changes, \
         \"whole_write\" replaces the full content, \"rollback\" undoes the most recent change \
         to the file and \"list_versions\" shows its change history.",
    )
    .param(
        "mode",
        Required,
        "One of \"edit\", \"whole_write\", \"rollback\" or \"list_versions\".",
    )
    .param(
        "path",
        Required,
        "The path of the file, relative to the workspace root.",
    )
    .param(
        "commit_message",
        Conditional("required for \"whole_write\" or \"edit\" mode".to_string()),
        "A short conventional-commit message describing the change (e.g. \"fix: ...\").",
    )
    .param(
        "kodu_diff",
        Conditional("required for \"edit\" mode".to_string()),
        diff_description,
    )
    .param(
        "kodu_content",
        Conditional("required for \"whole_write\" mode".to_string()),
        "The complete final content of the file, with no placeholders or omissions. It \
         replaces the file or creates it.",
    )
    .capability(
        "You can use file_editor in 'whole_write' mode to create a file or replace its entire \
         content.",
    )
    .capability(
        "You can use file_editor in 'edit' mode with kodu_diff to make precise changes using git \
         conflict blocks. Every block of one call is applied together or not at all.",
    )
    .capability(
        "You can use file_editor in 'rollback' mode to undo the most recent change to a file.",
    )
    .extra(
        "### Rules for file_editor\n\
         1. Read the latest version of the file before an edit; HEAD content must match exactly.\n\
         2. Gather all changes to a file into one call, with blocks in top-to-bottom order.\n\
         3. Keep indentation and whitespace exactly as in the file.\n\
         4. If an edit fails, read the file again and resend all blocks; nothing was applied.\n\
         5. Only one level of rollback is available per file.",
    )
    .example(
        "Edit a function and its import in one transaction",
        invocation(
            tool,
            &[
                ("path", "src/lib.rs"),
                ("mode", "edit"),
                ("commit_message", "fix(lib): use checked addition"),
                (
                    "kodu_diff",
                    "\n<<<<<<< HEAD\nuse std::fmt;\n\npub fn add(a: u32, b: u32) -> u32 {\n    a + b\n}\n=======\nuse std::fmt;\n\npub fn add(a: u32, b: u32) -> Option<u32> {\n    a.checked_add(b)\n}\n>>>>>>> updated\n",
                ),
            ],
        ),
    )
    .example(
        "Create a new file",
        invocation(
            tool,
            &[
                ("path", "src/greeting.rs"),
                ("mode", "whole_write"),
                ("commit_message", "feat: add greeting"),
                (
                    "kodu_content",
                    "\npub fn greet() -> &'static str {\n    \"hello\"\n}\n",
                ),
            ],
        ),
    )
    .example(
        "Undo the last change to a file",
        invocation(tool, &[("path", "src/lib.rs"), ("mode", "rollback")]),
    )
}

pub fn ask_followup_question() -> ToolPromptSchema {
    let tool = ToolName::AskFollowupQuestion;
    ToolPromptSchema::new(
        tool.as_str(),
        "Ask the user a question when the task is ambiguous or information is missing. Use it \
         only when you cannot proceed otherwise.",
    )
    .param(
        "question",
        Required,
        "A clear, specific question about the information you need.",
    )
    .capability(
        "You can use ask_followup_question to get clarification from the user when you are \
         blocked by missing information.",
    )
    .example(
        "Ask which database to target",
        invocation(
            tool,
            &[("question", "Should the migration target PostgreSQL or SQLite?")],
        ),
    )
}

pub fn search_symbol() -> ToolPromptSchema {
    let tool = ToolName::SearchSymbol;
    ToolPromptSchema::new(
        tool.as_str(),
        "Find the definition of a code symbol (function, type, method) and its surrounding \
         context.",
    )
    .param(
        "symbolName",
        Required,
        "The name of the symbol to find.",
    )
    .param(
        "path",
        Required,
        "The directory to search, relative to the workspace root.",
    )
    .capability(
        "You can use search_symbol to see how a function, type or method is implemented and to \
         map dependencies before changing it.",
    )
    .example(
        "Find a function definition",
        invocation(tool, &[("symbolName", "parse_blocks"), ("path", "src")]),
    )
}

pub fn url_screenshot() -> ToolPromptSchema {
    let tool = ToolName::UrlScreenshot;
    ToolPromptSchema::new(
        tool.as_str(),
        "Capture a screenshot and the console logs of a web page right after it loads. The page \
         is not interacted with.",
    )
    .param(
        "url",
        Required,
        "The URL to open, including the protocol (e.g. http://localhost:3000).",
    )
    .capability(
        "You can use url_screenshot to verify that a web page renders correctly and to inspect \
         console errors during page load.",
    )
    .example(
        "Check a local development server",
        invocation(tool, &[("url", "http://localhost:3000")]),
    )
    .requires(ConditionalBlock::Vision)
}

pub fn attempt_completion() -> ToolPromptSchema {
    let tool = ToolName::AttemptCompletion;
    ToolPromptSchema::new(
        tool.as_str(),
        "Present the result of your work once every previous tool use has succeeded and the \
         task is complete. The user may reply with feedback to continue.",
    )
    .param(
        "result",
        Required,
        "The final result. Do not end it with a question or an offer of further help.",
    )
    .capability(
        "You can use attempt_completion to hand the finished task back to the user.",
    )
    .example(
        "Report a finished change",
        invocation(
            tool,
            &[("result", "Added checked addition to src/lib.rs; all tests pass.")],
        ),
    )
}

pub fn explore_repo_folder() -> ToolPromptSchema {
    let tool = ToolName::ExploreRepoFolder;
    ToolPromptSchema::new(
        tool.as_str(),
        "List the top-level definitions (types, functions, methods) of the source files in a \
         directory to understand the architecture of a codebase.",
    )
    .param(
        "path",
        Required,
        "The directory to explore, relative to the workspace root.",
    )
    .capability(
        "You can use explore_repo_folder to get an overview of the important constructs of a \
         directory without reading every file.",
    )
    .example(
        "Explore the agent module",
        invocation(tool, &[("path", "src/agent")]),
    )
}

pub fn spawn_agent() -> ToolPromptSchema {
    let tool = ToolName::SpawnAgent;
    ToolPromptSchema::new(
        tool.as_str(),
        "Spawn a sub-agent with its own instructions and a narrower tool set. You are suspended \
         until the sub-agent exits, and its final result becomes this tool's response. The user \
         must approve the spawn.",
    )
    .param(
        "agentName",
        Required,
        "The kind of agent to spawn: 'planner' to break a task into steps, 'sub_task' to carry \
         out one part of a larger task, or 'print_debugger' to locate the root cause of a bug.",
    )
    .param(
        "instructions",
        Required,
        "Detailed instructions for the sub-agent: its task, objectives and expected result.",
    )
    .param(
        "files",
        Optional,
        "Comma-separated list of files the sub-agent should focus on, without spaces.",
    )
    .capability(
        "You can use spawn_agent to delegate a well-defined part of a large task to a \
         specialised sub-agent and receive its result when it finishes.",
    )
    .example(
        "Delegate running the tests",
        invocation(
            tool,
            &[
                ("agentName", "sub_task"),
                (
                    "instructions",
                    "Run the unit tests and report every failure with its message.",
                ),
                ("files", "Cargo.toml,README.md"),
            ],
        ),
    )
    .example(
        "Ask for a plan",
        invocation(
            tool,
            &[
                ("agentName", "planner"),
                (
                    "instructions",
                    "Plan the implementation of the export feature as ordered sub-tasks.",
                ),
            ],
        ),
    )
}

pub fn server_runner() -> ToolPromptSchema {
    let tool = ToolName::ServerRunner;
    ToolPromptSchema::new(
        tool.as_str(),
        "Start, stop, restart or read the logs of a named development server. This is the only \
         tool that may start a server. Give every server a name so you can refer to it later.",
    )
    .param(
        "commandType",
        Required,
        "One of 'start', 'stop', 'restart' or 'getLogs'.",
    )
    .param(
        "serverName",
        Required,
        "The name identifying the server instance.",
    )
    .param(
        "commandToRun",
        Conditional("required for 'start' and 'restart'".to_string()),
        "The command that starts the server, valid for the current operating system.",
    )
    .param(
        "lines",
        Optional,
        "How many log lines to return for 'getLogs'. Defaults to all.",
    )
    .capability(
        "You can use server_runner to keep development servers running in the background and \
         inspect their logs.",
    )
    .example(
        "Start a development server",
        invocation(
            tool,
            &[
                ("commandType", "start"),
                ("serverName", "frontend"),
                ("commandToRun", "npm run dev"),
            ],
        ),
    )
    .example(
        "Read recent logs",
        invocation(
            tool,
            &[
                ("commandType", "getLogs"),
                ("serverName", "frontend"),
                ("lines", "50"),
            ],
        ),
    )
}

pub fn add_interested_file() -> ToolPromptSchema {
    let tool = ToolName::AddInterestedFile;
    ToolPromptSchema::new(
        tool.as_str(),
        "Track a file that matters for the current task together with the reason it matters.",
    )
    .param(
        "path",
        Required,
        "The path of the file to track, relative to the workspace root.",
    )
    .param(
        "why",
        Required,
        "Why this file is relevant to the task.",
    )
    .capability(
        "You can use add_interested_file to remember which files are relevant and why.",
    )
    .example(
        "Track a configuration file",
        invocation(
            tool,
            &[
                ("path", "src/config/model.rs"),
                ("why", "Holds the defaults the new option must follow."),
            ],
        ),
    )
}

pub fn exit_agent() -> ToolPromptSchema {
    let tool = ToolName::ExitAgent;
    ToolPromptSchema::new(
        tool.as_str(),
        "Finish this sub-agent and return its final result to the agent that spawned it.",
    )
    .param(
        "result",
        Required,
        "A detailed, to-the-point account of what was done and what was found.",
    )
    .capability(
        "Once your task is finished you can use exit_agent to hand your result back to the \
         spawning agent.",
    )
    .example(
        "Return findings",
        invocation(
            tool,
            &[("result", "The panic comes from an unchecked index in parser.rs line 42.")],
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_definition_is_valid() {
        for name in ToolName::ALL {
            let schema = definition(name);
            schema.validate().unwrap();
            assert_eq!(schema.name, name.as_str());
        }
    }

    #[test]
    fn default_tools_exclude_exit_agent() {
        let names: Vec<String> = default_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names.len(), ToolName::ALL.len() - 1);
        assert!(!names.iter().any(|n| n == "exit_agent"));
    }

    #[test]
    fn only_url_screenshot_requires_vision() {
        for name in ToolName::ALL {
            let gated = !definition(name).required_features.is_empty();
            assert_eq!(gated, name == ToolName::UrlScreenshot, "{}", name);
        }
    }

    #[test]
    fn descriptions_contain_no_template_tags() {
        for name in ToolName::ALL {
            let rendered = definition(name).render("Kodu");
            assert!(!rendered.contains("{{"), "{} renders a template tag", name);
        }
    }

    #[test]
    fn invocation_renders_wire_format() {
        assert_eq!(
            invocation(ToolName::ReadFile, &[("path", "a.rs")]),
            "<read_file>\n<path>a.rs</path>\n</read_file>"
        );
    }
}
