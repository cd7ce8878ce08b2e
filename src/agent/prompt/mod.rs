//! Prompt composition.
//!
//! This module provides:
//!
//! - **Template**: validator, parser, conditional block expander and
//!   placeholder resolver
//! - **Context**: [`PromptConfig`], validated at construction
//! - **Builder**: [`PromptBuilder`], which renders a config plus a tool
//!   registry into one system prompt

mod builder;
mod context;
pub mod template;

pub use builder::{BuildOptions, PromptBuilder, strip_empty_lines};
pub use context::PromptConfig;
pub use template::{
    ConditionalBlock, ExpandedTemplate, FeatureFlags, Placeholder, PlaceholderValues, Template,
    TemplateError, TemplateValidationResult, block, placeholder, validate_template,
};
