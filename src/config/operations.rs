//! Config loading, validation, and utility operations.

use super::model::Config;
use crate::agent::prompt::{BuildOptions, Template};
use crate::context::{SystemInfo, WorkspaceContext};
use crate::diff::MAX_DIFF_BLOCKS;
use crate::error::{KoduError, Result};
use crate::tools::ToolName;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::HashSet;
use std::path::Path;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(KoduError::UserError)` - The file could not be read
    /// * `Err(KoduError::ConfigError)` - Parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            KoduError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load the workspace config, or defaults when it has none.
    pub fn load_for(ctx: &WorkspaceContext) -> Result<Self> {
        let path = ctx.config_path();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| KoduError::ConfigError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| KoduError::UserError(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `agent_name` must be non-empty
    /// - `diff.max_blocks` must be between 1 and 5
    /// - `disabled_tools` entries must be valid globs
    /// - `prompt_templates` must pass template validation
    /// - `custom_tools` must be valid schemas with unique, non-built-in names
    pub fn validate(&self) -> Result<()> {
        if self.agent_name.trim().is_empty() {
            return Err(KoduError::ConfigError(
                "config validation failed: agent_name must not be empty".to_string(),
            ));
        }

        if !(1..=MAX_DIFF_BLOCKS).contains(&self.diff.max_blocks) {
            return Err(KoduError::ConfigError(format!(
                "config validation failed: diff.max_blocks must be between 1 and {} (found {})",
                MAX_DIFF_BLOCKS, self.diff.max_blocks
            )));
        }

        self.disabled_tools_matcher()?;

        for (role, source) in &self.prompt_templates {
            Template::parse(source.as_str()).map_err(|e| {
                KoduError::ConfigError(format!(
                    "config validation failed: prompt_templates.{}: {}",
                    role, e
                ))
            })?;
        }

        let mut seen = HashSet::new();
        for tool in &self.custom_tools {
            tool.validate()?;
            if tool.name.parse::<ToolName>().is_ok() {
                return Err(KoduError::ConfigError(format!(
                    "config validation failed: custom tool '{}' shadows a built-in tool",
                    tool.name
                )));
            }
            if !seen.insert(tool.name.as_str()) {
                return Err(KoduError::ConfigError(format!(
                    "config validation failed: custom tool '{}' is defined twice",
                    tool.name
                )));
            }
        }

        Ok(())
    }

    /// Compile `disabled_tools` into a matcher.
    pub fn disabled_tools_matcher(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.disabled_tools {
            let glob = Glob::new(pattern).map_err(|e| {
                KoduError::ConfigError(format!(
                    "config validation failed: invalid disabled_tools pattern '{}': {}",
                    pattern, e
                ))
            })?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| KoduError::ConfigError(format!("failed to build tool matcher: {}", e)))
    }

    /// Host information for `cwd`, with configured overrides applied.
    pub fn system_info(&self, cwd: &Path) -> SystemInfo {
        let mut info = SystemInfo::detect(cwd);
        if let Some(os) = &self.os_name {
            info.os_name = os.clone();
        }
        if let Some(shell) = &self.default_shell {
            info.default_shell = shell.clone();
        }
        if let Some(home) = &self.home_dir {
            info.home_dir = home.clone();
        }
        info
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            remove_empty_lines: self.remove_empty_lines,
        }
    }
}
