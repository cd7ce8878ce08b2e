//! The Diff Patch Engine.
//!
//! Blocks are matched against the in-memory content left to right. Each
//! search starts where the previous block's match ended, so blocks must be
//! given in document order. Either every block applies and the new content
//! is returned, or the first failing block is reported and the content is
//! left untouched.
//!
//! A file whose every line ends in `\r\n` is matched on its `\n` form and
//! written back with `\r\n`, so blocks apply whichever ending they carry.

use super::helpers::{
    Span, exact_matches, line_number_at, nearest_region, tolerant_matches, uses_crlf,
};
use super::parser::DiffBlock;
use crate::config::{DiffSettings, MatchPolicy};
use crate::error::KoduError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Why a block did not match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MismatchReason {
    NotFound,
    Ambiguous { occurrences: usize },
    EmptyHead,
}

impl fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MismatchReason::NotFound => f.write_str("not found"),
            MismatchReason::Ambiguous { occurrences } => {
                write!(f, "ambiguous: {} occurrences", occurrences)
            }
            MismatchReason::EmptyHead => f.write_str("empty head"),
        }
    }
}

/// The part of the file that most resembles a block that did not match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NearestRegion {
    /// 1-based line number of the region's first line.
    pub line: usize,
    pub text: String,
}

/// A transaction that could not be applied.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("block {block} of {total} could not be applied: {reason}")]
pub struct PatchFailure {
    /// 1-based index of the first failing block.
    pub block: usize,
    pub total: usize,
    pub reason: MismatchReason,
    /// The block's HEAD content.
    pub expected: String,
    pub nearest: Option<NearestRegion>,
}

impl PatchFailure {
    /// Multi-line report used in tool responses and by the diff fixer.
    pub fn report(&self) -> String {
        let mut out = format!(
            "{}\nNo changes were applied.\n\nExpected content (block {}):\n{}\n",
            self, self.block, self.expected
        );
        match (&self.reason, &self.nearest) {
            (MismatchReason::Ambiguous { .. }, _) => {
                out.push_str("\nAdd more surrounding lines so the block matches exactly once.\n");
            }
            (_, Some(region)) => {
                out.push_str(&format!(
                    "\nClosest content in the file (line {}):\n{}\n",
                    region.line, region.text
                ));
            }
            (_, None) => {
                out.push_str("\nNo similar content was found in the file.\n");
            }
        }
        out
    }
}

impl From<PatchFailure> for KoduError {
    fn from(failure: PatchFailure) -> Self {
        KoduError::PatchFailed(failure.report())
    }
}

/// Result of a successful transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patched {
    pub content: String,
    /// 1-based line in the original content where each block matched.
    pub lines: Vec<usize>,
}

/// Apply every block to `content`, or none of them.
pub fn apply_blocks(
    content: &str,
    blocks: &[DiffBlock],
    settings: &DiffSettings,
) -> Result<Patched, PatchFailure> {
    if !uses_crlf(content) {
        return apply_in_place(content, blocks, settings);
    }

    let blocks: Vec<DiffBlock> = blocks
        .iter()
        .map(|block| DiffBlock {
            head: block.head.replace("\r\n", "\n"),
            updated: block.updated.replace("\r\n", "\n"),
        })
        .collect();
    let patched = apply_in_place(&content.replace("\r\n", "\n"), &blocks, settings)?;
    Ok(Patched {
        content: patched.content.replace('\n', "\r\n"),
        lines: patched.lines,
    })
}

fn apply_in_place(
    content: &str,
    blocks: &[DiffBlock],
    settings: &DiffSettings,
) -> Result<Patched, PatchFailure> {
    let total = blocks.len();
    let mut output = String::with_capacity(content.len());
    let mut lines = Vec::with_capacity(total);
    let mut cursor = 0;

    for (index, block) in blocks.iter().enumerate() {
        let fail = |reason: MismatchReason, nearest: Option<NearestRegion>| PatchFailure {
            block: index + 1,
            total,
            reason,
            expected: block.head.clone(),
            nearest,
        };

        if block.head.trim().is_empty() {
            return Err(fail(MismatchReason::EmptyHead, None));
        }

        let (start, end) = match locate(content, cursor, &block.head, settings) {
            Ok(span) => span,
            Err(MismatchReason::NotFound) => {
                let nearest = nearest_region(content, &block.head);
                return Err(fail(MismatchReason::NotFound, nearest));
            }
            Err(reason) => return Err(fail(reason, None)),
        };

        output.push_str(&content[cursor..start]);
        output.push_str(&block.updated);
        lines.push(line_number_at(content, start));

        cursor = end;
        // A block that deletes whole lines also takes their line break.
        if block.updated.is_empty() && content[cursor..].starts_with('\n') {
            cursor += 1;
        }
    }

    output.push_str(&content[cursor..]);
    Ok(Patched {
        content: output,
        lines,
    })
}

fn locate(
    content: &str,
    from: usize,
    head: &str,
    settings: &DiffSettings,
) -> Result<Span, MismatchReason> {
    let matches = if settings.tolerate_trailing_whitespace {
        tolerant_matches(content, from, head)
    } else {
        exact_matches(content, from, head)
    };

    match (matches.len(), settings.match_policy) {
        (0, _) => Err(MismatchReason::NotFound),
        (1, _) | (_, MatchPolicy::FirstMatch) => Ok(matches[0]),
        (n, MatchPolicy::Unique) => Err(MismatchReason::Ambiguous { occurrences: n }),
    }
}
