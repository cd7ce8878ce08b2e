//! Prompt template engine.
//!
//! # Syntax
//!
//! - `{{name}}` - a placeholder from the closed [`Placeholder`] vocabulary
//! - `{{#flag}} ... {{/flag}}` - a conditional block, kept only when `flag`
//!   is enabled; blocks nest to any depth
//!
//! Anything else (including a `{{` that never closes) is literal text.
//!
//! # Pipeline
//!
//! 1. [`validate_template`] checks the syntax in one pass with a block stack.
//! 2. [`Template::parse`] refuses invalid input and builds a typed AST.
//! 3. [`Template::expand`] resolves blocks against [`FeatureFlags`].
//! 4. [`ExpandedTemplate::resolve`] substitutes placeholder values.
//!
//! Expansion always runs before substitution, so values can never introduce
//! tags of their own.

mod expand;
mod lexer;
mod parser;
mod validate;
mod vocabulary;


pub use expand::{ExpandedTemplate, PlaceholderValues};
pub use validate::{TemplateValidationResult, validate_template};
pub use vocabulary::{ConditionalBlock, FeatureFlags, Placeholder, block, placeholder};

use crate::error::{KoduError, Result};
use parser::Node;
use serde::Serialize;
use thiserror::Error;

/// A structural problem found while validating a template.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateError {
    #[error("unknown placeholder '{{{{{name}}}}}' at position {position}")]
    UnknownPlaceholder { name: String, position: usize },

    #[error("unknown conditional block '{name}' at position {position}")]
    UnknownBlock { name: String, position: usize },

    #[error("block '{found}' closed at position {position} but '{expected}' is open")]
    MismatchedBlock {
        expected: String,
        found: String,
        position: usize,
    },

    #[error("closing tag '{name}' at position {position} has no open block")]
    UnexpectedClose { name: String, position: usize },

    #[error("block '{name}' opened at position {position} is never closed")]
    UnclosedBlock { name: String, position: usize },

    #[error("literal '{{{{' at position {position} would form a new tag once a block is expanded")]
    BlockInsideLiteral { position: usize },
}

/// A validated, parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    nodes: Vec<Node>,
}

impl Template {
    /// Validate and parse a template.
    ///
    /// Returns `KoduError::ConfigError` listing every validation error when the
    /// template is invalid.
    pub fn parse(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let report = validate_template(&source);
        if !report.is_valid {
            let details = report
                .errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(KoduError::ConfigError(format!("invalid template: {}", details)));
        }

        let nodes = parser::parse_tokens(&lexer::tokenize(&source));
        Ok(Self { source, nodes })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Resolve every conditional block against `flags`.
    pub fn expand(&self, flags: &FeatureFlags) -> ExpandedTemplate {
        ExpandedTemplate::from_nodes(&self.nodes, flags)
    }

    /// Expand and substitute in one step.
    pub fn render(&self, flags: &FeatureFlags, values: &PlaceholderValues) -> String {
        self.expand(flags).resolve(values)
    }
}

/// Expand conditional blocks in a template string, keeping placeholders.
///
/// The output is block-free; running it through `expand` again returns it
/// unchanged.
pub fn expand(source: &str, flags: &FeatureFlags) -> Result<String> {
    Ok(Template::parse(source)?.expand(flags).source())
}
