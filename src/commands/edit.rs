//! Implementations of `kodu edit`, `kodu rollback` and `kodu versions`.
//!
//! All three run one `file_editor` transaction through the diff engine.

use super::{load_workspace, open_editor, read_input};
use crate::agent::{AgentRole, role_registry};
use crate::cli::{EditArgs, PathArgs};
use crate::config::Config;
use crate::diff::{EditOutcome, EditReport, FileEditor};
use crate::error::{KoduError, Result};
use crate::tools::{FileEditAction, ToolCall, parse_tool_call};

/// Execute the `kodu edit` command.
///
/// On a diff mismatch the failure report is the error message and the
/// process exits with the patch-failure code.
pub fn cmd_edit(args: EditArgs) -> Result<()> {
    let (ctx, config) = load_workspace()?;
    let response = read_input(&args.response)?;
    let mut editor = open_editor(&ctx, &config)?;
    let report = apply_response(&mut editor, &config, &response)?;
    println!("{}", report.response_text());
    Ok(())
}

/// Execute the `kodu rollback` command.
pub fn cmd_rollback(args: PathArgs) -> Result<()> {
    run_action(&args.path, FileEditAction::Rollback)
}

/// Execute the `kodu versions` command.
pub fn cmd_versions(args: PathArgs) -> Result<()> {
    run_action(&args.path, FileEditAction::ListVersions)
}

fn run_action(path: &str, action: FileEditAction) -> Result<()> {
    let (ctx, config) = load_workspace()?;
    let mut editor = open_editor(&ctx, &config)?;
    let report = applied(editor.apply(path, &action)?)?;
    println!("{}", report.response_text());
    Ok(())
}

/// Parse the single `file_editor` call in `response` and apply it.
pub(super) fn apply_response(
    editor: &mut FileEditor,
    config: &Config,
    response: &str,
) -> Result<EditReport> {
    let registry = role_registry(AgentRole::Main, config)?;
    let call = parse_tool_call(response, &registry)?
        .ok_or_else(|| KoduError::UserError("response contains no tool call".to_string()))?;

    match call {
        ToolCall::FileEditor { path, edit } => applied(editor.apply(&path, &edit)?),
        other => Err(KoduError::UserError(format!(
            "expected a file_editor call, found '{}'",
            other.name()
        ))),
    }
}

fn applied(outcome: EditOutcome) -> Result<EditReport> {
    match outcome {
        EditOutcome::Applied(report) => Ok(report),
        EditOutcome::Mismatch(failure) => Err(KoduError::PatchFailed(failure.report())),
    }
}
