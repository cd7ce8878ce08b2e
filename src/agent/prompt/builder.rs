//! The Prompt Builder.
//!
//! Composes a validated [`PromptConfig`], its own [`ToolRegistry`] and any
//! explicit sections into the final system prompt. Builders share nothing, so
//! several roles can be built side by side.

use super::context::PromptConfig;
use super::template::{Placeholder, PlaceholderValues};
use crate::context::WorkspaceContext;
use crate::error::Result;
use crate::events::{self, Event, EventAction};
use crate::tools::{ToolPromptSchema, ToolRegistry};
use serde_json::json;

/// Options for [`PromptBuilder::build`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Drop lines that are empty or whitespace-only.
    pub remove_empty_lines: bool,
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    config: PromptConfig,
    registry: ToolRegistry,
    capabilities: Vec<String>,
    sections: Vec<(Placeholder, String)>,
    label: Option<String>,
    workspace: Option<WorkspaceContext>,
}

impl PromptBuilder {
    pub fn new(config: PromptConfig) -> Self {
        let registry = ToolRegistry::new(config.features.clone());
        Self {
            config,
            registry,
            capabilities: Vec::new(),
            sections: Vec::new(),
            label: None,
            workspace: None,
        }
    }

    /// Name recorded as `agent` on the `prompt_built` event.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Attach a workspace so builds are logged.
    pub fn with_workspace(mut self, ctx: WorkspaceContext) -> Self {
        self.workspace = Some(ctx);
        self
    }

    pub fn config(&self) -> &PromptConfig {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Register a tool. Returns `Ok(false)` when feature flags gate it out.
    pub fn add_tool(&mut self, tool: ToolPromptSchema) -> Result<bool> {
        self.registry.add_tool(tool)
    }

    pub fn add_tools<I>(&mut self, tools: I) -> Result<()>
    where
        I: IntoIterator<Item = ToolPromptSchema>,
    {
        self.registry.add_tools(tools)
    }

    /// Add a capability bullet that belongs to no tool.
    pub fn add_capability(&mut self, text: impl Into<String>) {
        self.capabilities.push(text.into());
    }

    /// Set explicit content for a placeholder, overriding the built-in value.
    pub fn add_section(&mut self, placeholder: Placeholder, content: impl Into<String>) {
        self.sections.push((placeholder, content.into()));
    }

    /// Render the system prompt.
    pub fn build(&self, options: BuildOptions) -> String {
        let values = self.placeholder_values();
        let rendered = self
            .config
            .template
            .render(&self.config.features, &values);

        let prompt = if options.remove_empty_lines {
            strip_empty_lines(&rendered)
        } else {
            rendered
        };

        let mut event = Event::new(EventAction::PromptBuilt).with_details(json!({
            "agent_name": self.config.agent_name,
            "tools": self.registry.names(),
            "features": self.config.features,
            "chars": prompt.chars().count(),
        }));
        if let Some(label) = &self.label {
            event = event.with_agent(label.clone());
        }
        events::record(self.workspace.as_ref(), event);

        prompt
    }

    fn placeholder_values(&self) -> PlaceholderValues {
        let mut values = self.config.scalar_values();
        values.insert(
            Placeholder::ToolSection,
            self.registry.tool_section(&self.config.agent_name),
        );
        values.insert(Placeholder::CapabilitiesSection, self.capabilities_section());
        values.insert(Placeholder::RulesSection, String::new());

        for (placeholder, content) in &self.sections {
            values.insert(*placeholder, content.clone());
        }
        values
    }

    fn capabilities_section(&self) -> String {
        self.registry
            .capabilities()
            .chain(self.capabilities.iter().map(String::as_str))
            .map(|c| format!("- {}", c))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Remove every line that contains only whitespace.
pub fn strip_empty_lines(text: &str) -> String {
    text.split_inclusive('\n')
        .filter(|line| !line.trim().is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::prompt::template::{ConditionalBlock, FeatureFlags};
    use crate::context::SystemInfo;
    use crate::events::read_events;
    use crate::tools::Requirement;
    use tempfile::TempDir;

    const SCENARIO: &str = "{{agentName}} on {{osName}}\n{{#vision}}sees images{{/vision}}";

    fn system() -> SystemInfo {
        SystemInfo {
            os_name: "Linux".to_string(),
            default_shell: "/bin/bash".to_string(),
            home_dir: "/home/dev".to_string(),
            cwd: "/home/dev/project".to_string(),
        }
    }

    fn builder(template: &str, features: FeatureFlags) -> PromptBuilder {
        PromptBuilder::new(PromptConfig::new("Kodu", &system(), template, features).unwrap())
    }

    fn tool(name: &str) -> ToolPromptSchema {
        ToolPromptSchema::new(name, format!("{} does things", name))
            .param("path", Requirement::Required, "Target path")
            .capability(format!("use {}", name))
            .example("Example", format!("<{0}><path>x</path></{0}>", name))
    }

    #[test]
    fn vision_scenario_renders_both_ways() {
        let strip = BuildOptions {
            remove_empty_lines: true,
        };

        let off = builder(SCENARIO, FeatureFlags::new());
        assert_eq!(off.build(strip), "Kodu on Linux\n");

        let on = builder(SCENARIO, FeatureFlags::new().with(ConditionalBlock::Vision, true));
        assert_eq!(on.build(strip), "Kodu on Linux\nsees images");
    }

    #[test]
    fn empty_lines_kept_unless_requested() {
        let b = builder("a\n\n  \nb", FeatureFlags::new());
        assert_eq!(b.build(BuildOptions::default()), "a\n\n  \nb");
        assert_eq!(
            b.build(BuildOptions {
                remove_empty_lines: true
            }),
            "a\nb"
        );
    }

    #[test]
    fn sections_follow_registration_order() {
        let mut b = builder("{{toolSection}}\n--\n{{capabilitiesSection}}", FeatureFlags::new());
        b.add_tools([tool("read_file"), tool("list_files")]).unwrap();
        b.add_capability("answer questions");

        let prompt = b.build(BuildOptions::default());
        let read = prompt.find("# read_file").unwrap();
        let list = prompt.find("# list_files").unwrap();
        assert!(read < list);
        assert!(prompt.ends_with("- use read_file\n- use list_files\n- answer questions"));
    }

    #[test]
    fn gated_tool_is_absent_from_both_sections() {
        let mut b = builder("{{toolSection}}{{capabilitiesSection}}", FeatureFlags::new());
        assert!(!b
            .add_tool(tool("url_screenshot").requires(ConditionalBlock::Vision))
            .unwrap());

        let prompt = b.build(BuildOptions::default());
        assert!(!prompt.contains("url_screenshot"));
    }

    #[test]
    fn rules_section_is_empty_and_sections_override() {
        let mut b = builder("[{{rulesSection}}][{{task}}]", FeatureFlags::new());
        assert_eq!(b.build(BuildOptions::default()), "[][]");

        b.add_section(Placeholder::RulesSection, "be brief");
        b.add_section(Placeholder::Task, "ship it");
        assert_eq!(b.build(BuildOptions::default()), "[be brief][ship it]");
    }

    #[test]
    fn repeated_placeholders_get_the_same_value() {
        let b = builder("{{agentName}}/{{agentName}}", FeatureFlags::new());
        assert_eq!(b.build(BuildOptions::default()), "Kodu/Kodu");
    }

    #[test]
    fn builders_are_independent() {
        let mut first = builder("{{toolSection}}", FeatureFlags::new());
        let second = first.clone();
        first.add_tool(tool("read_file")).unwrap();

        assert!(first.build(BuildOptions::default()).contains("read_file"));
        assert_eq!(second.build(BuildOptions::default()), "");
    }

    #[test]
    fn build_logs_when_workspace_attached() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = WorkspaceContext::at(temp_dir.path());
        let b = builder("{{agentName}}", FeatureFlags::new())
            .with_label("planner")
            .with_workspace(ctx.clone());

        b.build(BuildOptions::default());

        let events = read_events(&ctx).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, EventAction::PromptBuilt);
        assert_eq!(events[0].agent.as_deref(), Some("planner"));
    }
}
