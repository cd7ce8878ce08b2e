//! Configuration types and defaults for kodu.
//!
//! This module defines enums, nested settings, and default value functions
//! used by the Config struct.

use crate::diff::MAX_DIFF_BLOCKS;
use serde::{Deserialize, Serialize};

/// How a diff block's HEAD content is located in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// The HEAD content must occur exactly once in the remaining content
    /// (default, safest).
    #[default]
    Unique,
    /// Use the first occurrence in the remaining content.
    FirstMatch,
}

/// Diff Patch Engine settings (`diff:` section).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffSettings {
    pub match_policy: MatchPolicy,

    /// Compare lines with trailing whitespace ignored.
    pub tolerate_trailing_whitespace: bool,

    /// Maximum number of blocks in one `kodu_diff` (1..=5).
    #[serde(default = "default_max_blocks")]
    pub max_blocks: usize,
}

impl Default for DiffSettings {
    fn default() -> Self {
        Self {
            match_policy: MatchPolicy::default(),
            tolerate_trailing_whitespace: false,
            max_blocks: default_max_blocks(),
        }
    }
}

/// Version-control settings (`git:` section).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitSettings {
    /// Commit every applied file transaction when the workspace is a repository.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Push after each commit.
    pub push: bool,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            push: false,
        }
    }
}

// Default value functions for serde
pub(crate) fn default_agent_name() -> String {
    "Kodu".to_string()
}
pub(crate) fn default_max_blocks() -> usize {
    MAX_DIFF_BLOCKS
}
pub(crate) fn default_true() -> bool {
    true
}
