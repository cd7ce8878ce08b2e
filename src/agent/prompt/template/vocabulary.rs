//! The closed vocabularies a template may reference.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A placeholder name allowed inside `{{...}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Placeholder {
    #[serde(rename = "agentName")]
    AgentName,
    #[serde(rename = "osName")]
    OsName,
    #[serde(rename = "defaultShell")]
    DefaultShell,
    #[serde(rename = "homeDir")]
    HomeDir,
    #[serde(rename = "cwd")]
    Cwd,
    #[serde(rename = "toolSection")]
    ToolSection,
    #[serde(rename = "capabilitiesSection")]
    CapabilitiesSection,
    #[serde(rename = "rulesSection")]
    RulesSection,
    #[serde(rename = "task")]
    Task,
}

impl Placeholder {
    /// Every placeholder, in vocabulary order.
    pub const ALL: [Placeholder; 9] = [
        Placeholder::AgentName,
        Placeholder::OsName,
        Placeholder::DefaultShell,
        Placeholder::HomeDir,
        Placeholder::Cwd,
        Placeholder::ToolSection,
        Placeholder::CapabilitiesSection,
        Placeholder::RulesSection,
        Placeholder::Task,
    ];

    /// The name as written between the braces.
    pub fn as_str(&self) -> &'static str {
        match self {
            Placeholder::AgentName => "agentName",
            Placeholder::OsName => "osName",
            Placeholder::DefaultShell => "defaultShell",
            Placeholder::HomeDir => "homeDir",
            Placeholder::Cwd => "cwd",
            Placeholder::ToolSection => "toolSection",
            Placeholder::CapabilitiesSection => "capabilitiesSection",
            Placeholder::RulesSection => "rulesSection",
            Placeholder::Task => "task",
        }
    }

    /// The `{{name}}` token for this placeholder.
    pub fn token(&self) -> String {
        format!("{{{{{}}}}}", self.as_str())
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Placeholder {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Placeholder::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or(())
    }
}

/// A feature flag usable as a conditional block name (`{{#vision}}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionalBlock {
    /// The model accepts image input.
    Vision,
}

impl ConditionalBlock {
    /// Every known block name.
    pub const ALL: [ConditionalBlock; 1] = [ConditionalBlock::Vision];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionalBlock::Vision => "vision",
        }
    }
}

impl fmt::Display for ConditionalBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConditionalBlock {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConditionalBlock::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or(())
    }
}

/// Feature flag values for one render configuration.
///
/// Flags that are not set are disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureFlags(BTreeMap<ConditionalBlock, bool>);

impl FeatureFlags {
    /// All flags disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// All known flags enabled.
    pub fn all_enabled() -> Self {
        Self(ConditionalBlock::ALL.into_iter().map(|b| (b, true)).collect())
    }

    /// Builder-style setter.
    pub fn with(mut self, flag: ConditionalBlock, enabled: bool) -> Self {
        self.0.insert(flag, enabled);
        self
    }

    pub fn is_enabled(&self, flag: ConditionalBlock) -> bool {
        self.0.get(&flag).copied().unwrap_or(false)
    }

    /// True when every flag in `required` is enabled.
    pub fn satisfies(&self, required: &[ConditionalBlock]) -> bool {
        required.iter().all(|flag| self.is_enabled(*flag))
    }
}

/// The `{{name}}` token for composing templates in code.
pub fn placeholder(p: Placeholder) -> String {
    p.token()
}

/// Build the `{{#flag}}content{{/flag}}` syntax for composing templates in code.
pub fn block(flag: ConditionalBlock, content: &str) -> String {
    format!("{{{{#{0}}}}}{1}{{{{/{0}}}}}", flag.as_str(), content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_round_trips_through_name() {
        for p in Placeholder::ALL {
            assert_eq!(p.as_str().parse::<Placeholder>(), Ok(p));
        }
        assert!("agent_name".parse::<Placeholder>().is_err());
    }

    #[test]
    fn placeholder_token_has_double_braces() {
        assert_eq!(Placeholder::ToolSection.token(), "{{toolSection}}");
    }

    #[test]
    fn block_helper_wraps_content() {
        assert_eq!(
            block(ConditionalBlock::Vision, "sees images"),
            "{{#vision}}sees images{{/vision}}"
        );
    }

    #[test]
    fn unset_flags_are_disabled() {
        let flags = FeatureFlags::new();
        assert!(!flags.is_enabled(ConditionalBlock::Vision));
        assert!(flags.satisfies(&[]));
        assert!(!flags.satisfies(&[ConditionalBlock::Vision]));

        let flags = FeatureFlags::all_enabled();
        assert!(flags.satisfies(&[ConditionalBlock::Vision]));
    }

    #[test]
    fn flags_deserialize_from_yaml_map() {
        let flags: FeatureFlags = serde_yaml::from_str("vision: true").unwrap();
        assert!(flags.is_enabled(ConditionalBlock::Vision));
    }
}
