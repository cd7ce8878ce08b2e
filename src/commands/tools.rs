//! Implementation of the `kodu tools` command.
//!
//! Lists a role's registry after feature gating, custom tools and
//! `disabled_tools`.

use super::{load_workspace, parse_role};
use crate::agent::role_registry;
use crate::cli::ToolsArgs;
use crate::config::Config;
use crate::error::{KoduError, Result};
use crate::tools::ToolPromptSchema;

/// Execute the `kodu tools` command.
pub fn cmd_tools(args: ToolsArgs) -> Result<()> {
    let (_ctx, config) = load_workspace()?;
    println!("{}", render_tools(&config, &args.role, args.json)?);
    Ok(())
}

pub(super) fn render_tools(config: &Config, role: &str, json: bool) -> Result<String> {
    let role = parse_role(role)?;
    let registry = role_registry(role, config)?;

    if json {
        let schemas: Vec<&ToolPromptSchema> = registry.iter().collect();
        return serde_json::to_string_pretty(&schemas)
            .map_err(|e| KoduError::UserError(format!("failed to serialize tools: {}", e)));
    }

    let width = registry.iter().map(|t| t.name.len()).max().unwrap_or(0);
    let mut lines = vec![format!("Tools for {} ({}):", role, registry.len())];
    for tool in registry.iter() {
        let summary = tool.description.lines().next().unwrap_or("").trim();
        lines.push(format!("  {:<width$}  {}", tool.name, summary, width = width));
    }
    Ok(lines.join("\n"))
}
