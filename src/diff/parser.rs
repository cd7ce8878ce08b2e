//! `kodu_diff` block parsing.

use crate::error::{KoduError, Result};
use serde::{Deserialize, Serialize};

/// Upper bound on blocks in one `kodu_diff`.
pub const MAX_DIFF_BLOCKS: usize = 5;

pub const HEAD_MARKER: &str = "<<<<<<< HEAD";
pub const SEPARATOR_MARKER: &str = "=======";
pub const UPDATED_MARKER: &str = ">>>>>>> updated";

/// One edit unit: content expected in the file and its replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffBlock {
    /// Lines between `<<<<<<< HEAD` and `=======` with their own line
    /// endings, minus the one ending the last line.
    pub head: String,
    /// Lines between `=======` and `>>>>>>> updated`, kept the same way.
    pub updated: String,
}

enum State {
    Outside,
    Head(Vec<String>),
    Updated(Vec<String>, Vec<String>),
}

/// Parse a `kodu_diff` payload into ordered blocks.
///
/// Marker lines are recognized after trimming surrounding whitespace. Text
/// outside blocks is ignored.
///
/// # Arguments
///
/// * `diff` - The raw `kodu_diff` parameter value
/// * `max_blocks` - Maximum number of blocks accepted
///
/// # Returns
///
/// * `Ok(Vec<DiffBlock>)` - Blocks in the order they appear
/// * `Err(KoduError::PatchFailed)` - No blocks, too many blocks, or a block
///   missing its separator or end marker
pub fn parse_diff_blocks(diff: &str, max_blocks: usize) -> Result<Vec<DiffBlock>> {
    let mut blocks = Vec::new();
    let mut state = State::Outside;

    for (index, line) in diff.split_inclusive('\n').enumerate() {
        let marker = line.trim();
        let line_no = index + 1;

        state = match state {
            State::Outside => {
                if marker == HEAD_MARKER {
                    State::Head(Vec::new())
                } else if marker == SEPARATOR_MARKER || marker == UPDATED_MARKER {
                    return Err(malformed(format!(
                        "'{}' on line {} appears outside a block",
                        marker, line_no
                    )));
                } else {
                    State::Outside
                }
            }
            State::Head(mut head) => {
                if marker == SEPARATOR_MARKER {
                    State::Updated(head, Vec::new())
                } else if marker == HEAD_MARKER || marker == UPDATED_MARKER {
                    return Err(malformed(format!(
                        "block {} is missing '{}' before line {}",
                        blocks.len() + 1,
                        SEPARATOR_MARKER,
                        line_no
                    )));
                } else {
                    head.push(line.to_string());
                    State::Head(head)
                }
            }
            State::Updated(head, mut updated) => {
                if marker == UPDATED_MARKER {
                    blocks.push(DiffBlock {
                        head: joined(head),
                        updated: joined(updated),
                    });
                    State::Outside
                } else if marker == HEAD_MARKER || marker == SEPARATOR_MARKER {
                    return Err(malformed(format!(
                        "block {} is missing '{}' before line {}",
                        blocks.len() + 1,
                        UPDATED_MARKER,
                        line_no
                    )));
                } else {
                    updated.push(line.to_string());
                    State::Updated(head, updated)
                }
            }
        };
    }

    match state {
        State::Outside => {}
        State::Head(_) => {
            return Err(malformed(format!(
                "block {} is missing '{}'",
                blocks.len() + 1,
                SEPARATOR_MARKER
            )));
        }
        State::Updated(..) => {
            return Err(malformed(format!(
                "block {} is missing '{}'",
                blocks.len() + 1,
                UPDATED_MARKER
            )));
        }
    }

    if blocks.is_empty() {
        return Err(malformed(format!(
            "no '{}' blocks found",
            HEAD_MARKER
        )));
    }
    if blocks.len() > max_blocks {
        return Err(malformed(format!(
            "{} blocks given, at most {} are allowed per edit",
            blocks.len(),
            max_blocks
        )));
    }

    Ok(blocks)
}

fn joined(lines: Vec<String>) -> String {
    let mut text = lines.concat();
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    text
}

fn malformed(reason: String) -> KoduError {
    KoduError::PatchFailed(format!("invalid kodu_diff: {}", reason))
}
