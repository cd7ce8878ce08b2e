//! Implementation of the `kodu prompt` command.
//!
//! Renders the system prompt for one agent role from the workspace config.

use super::{load_workspace, parse_role};
use crate::agent::build_role_prompt;
use crate::agent::prompt::ConditionalBlock;
use crate::cli::PromptArgs;
use crate::config::Config;
use crate::context::WorkspaceContext;
use crate::error::Result;

/// Execute the `kodu prompt` command.
pub fn cmd_prompt(args: PromptArgs) -> Result<()> {
    let (ctx, config) = load_workspace()?;
    let prompt = render_prompt(&ctx, config, &args)?;
    print!("{}", prompt);
    if !prompt.ends_with('\n') {
        println!();
    }
    Ok(())
}

/// Render the prompt with the command-line flags layered over `config`.
pub(super) fn render_prompt(
    ctx: &WorkspaceContext,
    mut config: Config,
    args: &PromptArgs,
) -> Result<String> {
    let role = parse_role(&args.role)?;

    if args.vision {
        config.features = config.features.with(ConditionalBlock::Vision, true);
    }
    if args.keep_empty_lines {
        config.remove_empty_lines = false;
    }

    let system = config.system_info(&ctx.root);
    build_role_prompt(role, &config, &system, args.task.as_deref(), Some(ctx))
}
