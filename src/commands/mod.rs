//! Command implementations for kodu.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the helpers they share: workspace loading, input
//! reading (`-` is stdin) and opening the file editor.

mod edit;
mod parse;
mod prompt;
mod template;
mod tools;


use crate::agent::AgentRole;
use crate::cli::{Command, TemplateAction};
use crate::config::Config;
use crate::context::WorkspaceContext;
use crate::diff::FileEditor;
use crate::error::{KoduError, Result};
use crate::git::{self, GitHandler};
use std::io::Read;

/// Dispatch a command to its implementation.
///
/// This is the main entry point for command execution. Each command
/// is routed to its handler function.
pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Prompt(args) => prompt::cmd_prompt(args),
        Command::Template(cmd) => match cmd.action {
            TemplateAction::Validate(args) => template::cmd_validate(args),
            TemplateAction::Expand(args) => template::cmd_expand(args),
        },
        Command::Tools(args) => tools::cmd_tools(args),
        Command::Parse(args) => parse::cmd_parse(args),
        Command::Edit(args) => edit::cmd_edit(args),
        Command::Rollback(args) => edit::cmd_rollback(args),
        Command::Versions(args) => edit::cmd_versions(args),
    }
}

/// Resolve the workspace from the current directory and load its config.
fn load_workspace() -> Result<(WorkspaceContext, Config)> {
    let ctx = WorkspaceContext::resolve()?;
    let config = Config::load_for(&ctx)?;
    Ok((ctx, config))
}

/// Read a file argument, or stdin when it is `-`.
fn read_input(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| KoduError::UserError(format!("failed to read stdin: {}", e)))?;
        return Ok(buf);
    }

    std::fs::read_to_string(source)
        .map_err(|e| KoduError::UserError(format!("failed to read '{}': {}", source, e)))
}

fn parse_role(raw: &str) -> Result<AgentRole> {
    raw.parse::<AgentRole>()
}

/// Open the workspace's file editor, committing through git when enabled
/// and the workspace is a repository.
fn open_editor(ctx: &WorkspaceContext, config: &Config) -> Result<FileEditor> {
    let editor = FileEditor::open(ctx.clone(), config.diff)?;
    if config.git.enabled && git::is_repository(&ctx.root) {
        return Ok(editor.with_vcs(Box::new(GitHandler::new(&ctx.root)), config.git.push));
    }
    Ok(editor)
}
