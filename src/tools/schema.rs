//! Declarative tool schemas and their validation.

use crate::agent::prompt::ConditionalBlock;
use crate::error::{KoduError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Whether a parameter must be supplied.
///
/// `Conditional` carries a human-readable condition ("Required for \"edit\"
/// mode"). It is rendered into the prompt verbatim and not enforced by the
/// schema itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RequirementRepr", into = "RequirementRepr")]
pub enum Requirement {
    Required,
    #[default]
    Optional,
    Conditional(String),
}

/// YAML/JSON form: `required: true`, `required: false` or a condition string.
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RequirementRepr {
    Flag(bool),
    Condition(String),
}

impl From<RequirementRepr> for Requirement {
    fn from(repr: RequirementRepr) -> Self {
        match repr {
            RequirementRepr::Flag(true) => Requirement::Required,
            RequirementRepr::Flag(false) => Requirement::Optional,
            RequirementRepr::Condition(text) => Requirement::Conditional(text),
        }
    }
}

impl From<Requirement> for RequirementRepr {
    fn from(req: Requirement) -> Self {
        match req {
            Requirement::Required => RequirementRepr::Flag(true),
            Requirement::Optional => RequirementRepr::Flag(false),
            Requirement::Conditional(text) => RequirementRepr::Condition(text),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Required => f.write_str("required"),
            Requirement::Optional => f.write_str("optional"),
            Requirement::Conditional(text) => f.write_str(text),
        }
    }
}

/// One named parameter of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolParameter {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub param_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: Requirement,
}

impl ToolParameter {
    pub fn new(
        name: impl Into<String>,
        requirement: Requirement,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: "string".to_string(),
            description: description.into(),
            required: requirement,
        }
    }

    pub fn is_required(&self) -> bool {
        self.required == Requirement::Required
    }
}

/// A literal invocation shown to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolExample {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub output: String,
}

impl ToolExample {
    pub fn new(description: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            output: output.into(),
        }
    }
}

/// The prompt-facing definition of a tool.
///
/// Every field defaults when deserialized so that a config entry missing
/// e.g. `examples` reaches [`ToolPromptSchema::validate`] and fails there with
/// the tool's name rather than as an anonymous parse error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPromptSchema {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Declaration order is rendering order.
    #[serde(default)]
    pub parameters: Vec<ToolParameter>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub examples: Vec<ToolExample>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_descriptions: Option<String>,
    /// Feature flags that must all be enabled for the tool to be offered.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_features: Vec<ConditionalBlock>,
}

impl ToolPromptSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            capabilities: Vec::new(),
            examples: Vec::new(),
            extra_descriptions: None,
            required_features: Vec::new(),
        }
    }

    pub fn param(
        mut self,
        name: &str,
        requirement: Requirement,
        description: impl Into<String>,
    ) -> Self {
        self.parameters
            .push(ToolParameter::new(name, requirement, description));
        self
    }

    pub fn capability(mut self, text: impl Into<String>) -> Self {
        self.capabilities.push(text.into());
        self
    }

    pub fn example(mut self, description: impl Into<String>, output: impl Into<String>) -> Self {
        self.examples.push(ToolExample::new(description, output));
        self
    }

    pub fn extra(mut self, text: impl Into<String>) -> Self {
        self.extra_descriptions = Some(text.into());
        self
    }

    pub fn requires(mut self, flag: ConditionalBlock) -> Self {
        self.required_features.push(flag);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Check that the schema is complete and internally well-formed.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(KoduError::ConfigError(
                "invalid tool definition: name is empty".to_string(),
            ));
        }
        let fail = |reason: String| {
            Err(KoduError::ConfigError(format!(
                "invalid tool definition for '{}': {}",
                self.name, reason
            )))
        };

        if !is_tag_name(&self.name) {
            return fail("name must be lowercase letters, digits and underscores".to_string());
        }
        if self.description.trim().is_empty() {
            return fail("description is missing".to_string());
        }
        if self.capabilities.is_empty() {
            return fail("capabilities are missing".to_string());
        }
        if self.examples.is_empty() {
            return fail("examples are missing".to_string());
        }

        let mut seen = HashSet::new();
        for param in &self.parameters {
            if !is_parameter_name(&param.name) {
                return fail(format!("invalid parameter name '{}'", param.name));
            }
            if !seen.insert(param.name.as_str()) {
                return fail(format!("parameter '{}' is declared twice", param.name));
            }
            if param.param_type.trim().is_empty() {
                return fail(format!("parameter '{}' has no type", param.name));
            }
            if param.description.trim().is_empty() {
                return fail(format!("parameter '{}' has no description", param.name));
            }
            if let Requirement::Conditional(text) = &param.required
                && text.trim().is_empty()
            {
                return fail(format!(
                    "parameter '{}' has an empty requirement condition",
                    param.name
                ));
            }
        }

        for (i, example) in self.examples.iter().enumerate() {
            if example.description.trim().is_empty() || example.output.trim().is_empty() {
                return fail(format!(
                    "example {} needs both a description and an output",
                    i + 1
                ));
            }
        }

        Ok(())
    }

    /// Render this tool's entry of the `toolSection` placeholder.
    pub fn render(&self, agent_name: &str) -> String {
        let mut out = format!("# {}\n\nDescription: {}\n", self.name, self.description);

        if !self.parameters.is_empty() {
            out.push_str("\nParameters:\n");
            for param in &self.parameters {
                out.push_str(&format!(
                    "- {}: ({}) {}\n",
                    param.name, param.required, param.description
                ));
            }
        }

        if let Some(extra) = &self.extra_descriptions {
            out.push('\n');
            out.push_str(extra.trim_end());
            out.push('\n');
        }

        if !self.examples.is_empty() {
            out.push_str("\n## Examples:\n\n");
            let examples: Vec<String> = self
                .examples
                .iter()
                .map(|e| format!("### {}\n> {} Output\n{}", e.description, agent_name, e.output))
                .collect();
            out.push_str(&examples.join("\n\n"));
            out.push('\n');
        }

        out
    }
}

fn is_tag_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Parameters may be camelCase (`agentName`, `filePattern`).
fn is_parameter_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
