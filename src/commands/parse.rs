//! Implementation of the `kodu parse` command.

use super::{load_workspace, parse_role, read_input};
use crate::agent::role_registry;
use crate::cli::ParseArgs;
use crate::config::Config;
use crate::error::{KoduError, Result};
use crate::tools::parse_tool_call;

/// Execute the `kodu parse` command.
///
/// A malformed or multi-call response fails with a protocol violation.
pub fn cmd_parse(args: ParseArgs) -> Result<()> {
    let (_ctx, config) = load_workspace()?;
    let response = read_input(&args.response)?;
    match parse_response(&config, &args.role, &response)? {
        Some(json) => println!("{}", json),
        None => println!("No tool call found."),
    }
    Ok(())
}

/// The call in `response` as pretty JSON, `None` for a plain-text turn.
pub(super) fn parse_response(config: &Config, role: &str, response: &str) -> Result<Option<String>> {
    let registry = role_registry(parse_role(role)?, config)?;
    let Some(call) = parse_tool_call(response, &registry)? else {
        return Ok(None);
    };
    serde_json::to_string_pretty(&call)
        .map(Some)
        .map_err(|e| KoduError::UserError(format!("failed to serialize tool call: {}", e)))
}
