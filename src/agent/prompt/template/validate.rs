//! Static validation of template syntax.
//!
//! One linear pass over the token stream with an explicit stack of open
//! blocks. Nested blocks with the same flag name are pushed and popped
//! independently, so depth is tracked per occurrence rather than per name.

use super::TemplateError;
use super::lexer::{Lexed, TagKind, Token, tokenize};
use super::vocabulary::{ConditionalBlock, Placeholder};
use serde::Serialize;

/// Outcome of validating a template string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateValidationResult {
    pub is_valid: bool,
    pub errors: Vec<TemplateError>,
    pub warnings: Vec<String>,
}

/// Validate placeholder names and conditional-block structure.
pub fn validate_template(source: &str) -> TemplateValidationResult {
    let lexed = tokenize(source);
    let mut errors = Vec::new();
    let mut warnings: Vec<String> = lexed
        .literal_openers
        .iter()
        .map(|pos| format!("'{{{{' at position {} is not a template tag and is kept as text", pos))
        .collect();

    // (name, position, token index) of each open block
    let mut stack: Vec<(&str, usize, usize)> = Vec::new();

    for (index, token) in lexed.tokens.iter().enumerate() {
        let Token::Tag { kind, position } = *token else {
            continue;
        };

        match kind {
            TagKind::Open(name) => {
                if name.parse::<ConditionalBlock>().is_err() {
                    errors.push(TemplateError::UnknownBlock {
                        name: name.to_string(),
                        position,
                    });
                }
                stack.push((name, position, index));
            }
            TagKind::Close(name) => match stack.pop() {
                None => errors.push(TemplateError::UnexpectedClose {
                    name: name.to_string(),
                    position,
                }),
                Some((open_name, _, open_index)) => {
                    if open_name != name {
                        errors.push(TemplateError::MismatchedBlock {
                            expected: open_name.to_string(),
                            found: name.to_string(),
                            position,
                        });
                    } else if open_index + 1 == index {
                        warnings.push(format!(
                            "block '{}' closed at position {} is empty",
                            name, position
                        ));
                    }
                }
            },
            TagKind::Placeholder(name) => {
                if name.parse::<Placeholder>().is_err() {
                    errors.push(TemplateError::UnknownPlaceholder {
                        name: name.to_string(),
                        position,
                    });
                }
            }
        }
    }

    for (name, position, _) in stack {
        errors.push(TemplateError::UnclosedBlock {
            name: name.to_string(),
            position,
        });
    }
    errors.extend(
        blocks_inside_literals(&lexed)
            .into_iter()
            .map(|position| TemplateError::BlockInsideLiteral { position }),
    );

    TemplateValidationResult {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Literal `{{` openers followed by a block tag and then by a `}}` in text.
///
/// Removing or unwrapping the block would join the opener and the `}}` into
/// a tag that was not in the source.
fn blocks_inside_literals(lexed: &Lexed<'_>) -> Vec<usize> {
    let mut found = Vec::new();
    let mut armed: Option<usize> = None;
    let mut crossed = false;
    let mut offset = 0;

    for token in &lexed.tokens {
        match *token {
            Token::Text(text) => {
                let end = offset + text.len();
                let mut scan_from = offset;
                if let Some(last) = text.rfind("}}") {
                    if let Some(opener) = armed.take()
                        && crossed
                    {
                        found.push(opener);
                    }
                    crossed = false;
                    scan_from = offset + last + 2;
                }
                if armed.is_none() {
                    armed = lexed
                        .literal_openers
                        .iter()
                        .copied()
                        .find(|&pos| pos >= scan_from && pos < end);
                }
                offset = end;
            }
            Token::Tag { kind, .. } => {
                offset += match kind {
                    TagKind::Open(name) | TagKind::Close(name) => {
                        if armed.is_some() {
                            crossed = true;
                        }
                        name.len() + 5
                    }
                    TagKind::Placeholder(name) => name.len() + 4,
                };
            }
        }
    }

    found
}
