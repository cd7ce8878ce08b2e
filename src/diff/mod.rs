//! Diff Patch Engine for kodu.
//!
//! This module applies `kodu_diff` payloads to workspace files:
//! - Parsing git-conflict-style blocks (`<<<<<<< HEAD` / `=======` /
//!   `>>>>>>> updated`)
//! - Exact, ordered, all-or-nothing application with a precise failure report
//! - File edit transactions (`whole_write`, `edit`, `rollback`,
//!   `list_versions`) with persisted version history
//!
//! The matching is deterministic: each block's HEAD content must occur in the
//! part of the file after the previous block's match.

mod engine;
mod helpers;
mod parser;
mod transaction;

#[cfg(test)]
mod tests;

// Re-export public API
pub use engine::{MismatchReason, NearestRegion, PatchFailure, Patched, apply_blocks};
pub use parser::{
    DiffBlock, HEAD_MARKER, MAX_DIFF_BLOCKS, SEPARATOR_MARKER, UPDATED_MARKER, parse_diff_blocks,
};
pub use transaction::{
    EditMode, EditOutcome, EditReport, FileEditor, VersionEntry, VersionHistory,
};
