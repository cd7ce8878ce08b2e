//! CLI argument parsing for kodu.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};

/// Kodu: the prompt-and-tool protocol layer of a coding agent.
///
/// Renders role system prompts from templates, validates templates, parses
/// model tool invocations, and applies `file_editor` edits to the workspace:
/// - Prompts are built from `.kodu/config.yaml` and the role's tool subset
/// - Edits go through the diff engine, never partially applied
/// - Every applied edit is versioned and can be rolled back once
#[derive(Parser, Debug)]
#[command(name = "kodu")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for kodu.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the rendered system prompt for an agent role.
    ///
    /// Roles: main, planner, sub_task, print_debugger, diff_fixer.
    Prompt(PromptArgs),

    /// Template commands.
    ///
    /// Validate a template or expand its conditional blocks.
    Template(TemplateCommand),

    /// List the tools offered to a role.
    Tools(ToolsArgs),

    /// Parse a model response and print the tool call as JSON.
    ///
    /// Use `-` to read the response from stdin.
    Parse(ParseArgs),

    /// Apply the `file_editor` call in a model response to the workspace.
    ///
    /// Exits with code 3 when a diff does not match; the file is untouched.
    Edit(EditArgs),

    /// Undo the most recent edit of a file.
    Rollback(PathArgs),

    /// List the recorded versions of a file.
    Versions(PathArgs),
}

/// Arguments for the `prompt` command.
#[derive(Parser, Debug)]
pub struct PromptArgs {
    /// Agent role to render.
    pub role: String,

    /// Enable the vision feature flag.
    #[arg(long)]
    pub vision: bool,

    /// Task text substituted for `{{task}}`.
    #[arg(long)]
    pub task: Option<String>,

    /// Keep blank lines in the rendered prompt.
    #[arg(long)]
    pub keep_empty_lines: bool,
}

/// Template subcommands.
#[derive(Parser, Debug)]
pub struct TemplateCommand {
    #[command(subcommand)]
    pub action: TemplateAction,
}

/// Available template actions.
#[derive(Subcommand, Debug)]
pub enum TemplateAction {
    /// Check a template's placeholders and conditional blocks.
    ///
    /// Errors make the template unusable; warnings are reported only.
    Validate(TemplateFileArgs),

    /// Expand a template's conditional blocks, keeping placeholders.
    Expand(TemplateExpandArgs),
}

/// Arguments for `template validate`.
#[derive(Parser, Debug)]
pub struct TemplateFileArgs {
    /// Template file, or `-` for stdin.
    pub file: String,
}

/// Arguments for `template expand`.
#[derive(Parser, Debug)]
pub struct TemplateExpandArgs {
    /// Template file, or `-` for stdin.
    pub file: String,

    /// Enable the vision feature flag.
    #[arg(long)]
    pub vision: bool,
}

/// Arguments for the `tools` command.
#[derive(Parser, Debug)]
pub struct ToolsArgs {
    /// Agent role whose registry to list.
    #[arg(long, default_value = "main")]
    pub role: String,

    /// Print the full schemas as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `parse` command.
#[derive(Parser, Debug)]
pub struct ParseArgs {
    /// Response file, or `-` for stdin.
    pub response: String,

    /// Agent role whose registry the call is checked against.
    #[arg(long, default_value = "main")]
    pub role: String,
}

/// Arguments for the `edit` command.
#[derive(Parser, Debug)]
pub struct EditArgs {
    /// Response file holding one `file_editor` call, or `-` for stdin.
    pub response: String,
}

/// Arguments for the `rollback` and `versions` commands.
#[derive(Parser, Debug)]
pub struct PathArgs {
    /// Workspace-relative file path.
    pub path: String,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
