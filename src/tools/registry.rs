//! The Tool Schema Registry.
//!
//! A registry is an explicit value owned by one prompt builder. Feature
//! gating happens once, when a tool is added: a tool whose
//! `required_features` are not all enabled is left out of the registry.

use super::schema::ToolPromptSchema;
use crate::agent::prompt::FeatureFlags;
use crate::error::{KoduError, Result};
use globset::GlobSet;

/// Ordered, validated set of tool schemas for one configuration.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    features: FeatureFlags,
    tools: Vec<ToolPromptSchema>,
}

impl ToolRegistry {
    pub fn new(features: FeatureFlags) -> Self {
        Self {
            features,
            tools: Vec::new(),
        }
    }

    /// Validate and register a tool.
    ///
    /// Returns `Ok(false)` when the tool was gated out by feature flags.
    /// A second tool with an already registered name is a config error.
    pub fn add_tool(&mut self, tool: ToolPromptSchema) -> Result<bool> {
        tool.validate()?;

        if !self.features.satisfies(&tool.required_features) {
            return Ok(false);
        }
        if self.contains(&tool.name) {
            return Err(KoduError::ConfigError(format!(
                "tool '{}' is already registered",
                tool.name
            )));
        }

        self.tools.push(tool);
        Ok(true)
    }

    /// Register several tools. Stops at the first invalid schema.
    pub fn add_tools<I>(&mut self, tools: I) -> Result<()>
    where
        I: IntoIterator<Item = ToolPromptSchema>,
    {
        for tool in tools {
            self.add_tool(tool)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolPromptSchema> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolPromptSchema> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// A new registry holding the tools for which `keep` returns true.
    pub fn filtered<F>(&self, keep: F) -> Self
    where
        F: Fn(&ToolPromptSchema) -> bool,
    {
        Self {
            features: self.features.clone(),
            tools: self.tools.iter().filter(|t| keep(t)).cloned().collect(),
        }
    }

    /// A new registry without tools whose name matches `disabled`.
    pub fn without_disabled(&self, disabled: &GlobSet) -> Self {
        self.filtered(|t| !disabled.is_match(&t.name))
    }

    /// Every capability string, in tool registration order.
    pub fn capabilities(&self) -> impl Iterator<Item = &str> {
        self.tools
            .iter()
            .flat_map(|t| t.capabilities.iter().map(String::as_str))
    }

    /// Render the `toolSection` placeholder content.
    pub fn tool_section(&self, agent_name: &str) -> String {
        self.tools
            .iter()
            .map(|t| t.render(agent_name))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
