//! Config struct definition and default implementation.

use super::types::*;
use crate::agent::AgentRole;
use crate::agent::prompt::FeatureFlags;
use crate::tools::ToolPromptSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for kodu.
///
/// This struct represents the contents of `.kodu/config.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Prompt settings
    // =========================================================================
    /// Name the main agent calls itself (default: "Kodu").
    #[serde(default = "default_agent_name")]
    pub agent_name: String,

    /// Feature flags for conditional blocks and tool gating.
    pub features: FeatureFlags,

    /// Glob patterns of tool names removed from every role's registry.
    pub disabled_tools: Vec<String>,

    /// Strip blank lines from rendered prompts.
    #[serde(default = "default_true")]
    pub remove_empty_lines: bool,

    /// Per-role template overrides.
    pub prompt_templates: BTreeMap<AgentRole, String>,

    /// Extra tool schemas appended to every role's registry.
    pub custom_tools: Vec<ToolPromptSchema>,

    // =========================================================================
    // Host overrides
    // =========================================================================
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_shell: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_dir: Option<String>,

    // =========================================================================
    // Patch settings
    // =========================================================================
    pub diff: DiffSettings,

    pub git: GitSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            agent_name: default_agent_name(),
            features: FeatureFlags::default(),
            disabled_tools: Vec::new(),
            remove_empty_lines: default_true(),
            prompt_templates: BTreeMap::new(),
            custom_tools: Vec::new(),
            os_name: None,
            default_shell: None,
            home_dir: None,
            diff: DiffSettings::default(),
            git: GitSettings::default(),
        }
    }
}
