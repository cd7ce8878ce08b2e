//! Conditional block expansion and placeholder resolution.
//!
//! Expansion is a structural walk over the AST: an enabled block is replaced
//! by its expanded children, a disabled block by nothing. The result can no
//! longer contain blocks, which `ExpandedTemplate` encodes in its type.

use super::parser::Node;
use super::vocabulary::{FeatureFlags, Placeholder};
use std::collections::HashMap;

/// A piece of a block-free template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Placeholder(Placeholder),
}

/// A template after conditional expansion: only text and bare placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExpandedTemplate {
    segments: Vec<Segment>,
}

/// Values substituted for placeholders. Missing entries resolve to "".
pub type PlaceholderValues = HashMap<Placeholder, String>;

impl ExpandedTemplate {
    pub(super) fn from_nodes(nodes: &[Node], flags: &FeatureFlags) -> Self {
        let mut expanded = Self::default();
        expanded.extend(nodes, flags);
        expanded
    }

    fn extend(&mut self, nodes: &[Node], flags: &FeatureFlags) {
        for node in nodes {
            match node {
                Node::Text(text) => self.push_text(text),
                Node::Placeholder(p) => self.segments.push(Segment::Placeholder(*p)),
                Node::Block { flag, children } => {
                    if flags.is_enabled(*flag) {
                        self.extend(children, flags);
                    }
                }
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Text(last)) = self.segments.last_mut() {
            last.push_str(text);
        } else {
            self.segments.push(Segment::Text(text.to_string()));
        }
    }

    /// Placeholders referenced by this template, in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = Placeholder> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(p) => Some(*p),
            Segment::Text(_) => None,
        })
    }

    /// Template source with placeholders written back as `{{name}}`.
    pub fn source(&self) -> String {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Text(text) => text.clone(),
                Segment::Placeholder(p) => p.token(),
            })
            .collect()
    }

    /// Substitute every placeholder. Substituted values are inserted as-is
    /// and never scanned for further tags.
    pub fn resolve(&self, values: &PlaceholderValues) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder(p) => {
                    if let Some(value) = values.get(p) {
                        out.push_str(value);
                    }
                }
            }
        }
        out
    }
}
