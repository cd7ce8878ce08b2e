//! Prompt configuration.
//!
//! A `PromptConfig` owns exactly one template and one set of feature flags.
//! It is validated when constructed, so a builder can never render from an
//! incomplete configuration.

use super::template::{FeatureFlags, Placeholder, PlaceholderValues, Template};
use crate::context::SystemInfo;
use crate::error::{KoduError, Result};

/// Everything a prompt needs besides the tool registry.
#[derive(Debug, Clone)]
pub struct PromptConfig {
    pub agent_name: String,
    pub os_name: String,
    pub default_shell: String,
    pub home_dir: String,
    pub cwd: String,
    pub template: Template,
    pub features: FeatureFlags,
    /// Substituted into `{{task}}`; empty when absent.
    pub task: Option<String>,
}

impl PromptConfig {
    /// Build and validate a configuration.
    ///
    /// # Errors
    ///
    /// Returns `KoduError::ConfigError` if a required field is empty or the
    /// template does not pass validation.
    pub fn new(
        agent_name: impl Into<String>,
        system: &SystemInfo,
        template: &str,
        features: FeatureFlags,
    ) -> Result<Self> {
        let config = Self {
            agent_name: agent_name.into(),
            os_name: system.os_name.clone(),
            default_shell: system.default_shell.clone(),
            home_dir: system.home_dir.clone(),
            cwd: system.cwd.clone(),
            template: Template::parse(template)?,
            features,
            task: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Check that every required scalar is present.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("agentName", &self.agent_name),
            ("osName", &self.os_name),
            ("defaultShell", &self.default_shell),
            ("homeDir", &self.home_dir),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(KoduError::ConfigError(format!(
                    "prompt config field '{}' is required",
                    field
                )));
            }
        }
        Ok(())
    }

    /// Values for the scalar placeholders.
    pub fn scalar_values(&self) -> PlaceholderValues {
        PlaceholderValues::from([
            (Placeholder::AgentName, self.agent_name.clone()),
            (Placeholder::OsName, self.os_name.clone()),
            (Placeholder::DefaultShell, self.default_shell.clone()),
            (Placeholder::HomeDir, self.home_dir.clone()),
            (Placeholder::Cwd, self.cwd.clone()),
            (Placeholder::Task, self.task.clone().unwrap_or_default()),
        ])
    }
}
