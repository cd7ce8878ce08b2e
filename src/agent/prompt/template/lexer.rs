//! Tokenizer shared by the validator and the parser.
//!
//! A tag is `{{` followed by a non-empty body free of braces and then `}}`.
//! Anything else, including a `{{` that never closes, is literal text.

/// Kind of a `{{...}}` tag, carrying the raw (unvalidated) name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TagKind<'a> {
    /// `{{#name}}`
    Open(&'a str),
    /// `{{/name}}`
    Close(&'a str),
    /// `{{name}}`
    Placeholder(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Token<'a> {
    Text(&'a str),
    Tag { kind: TagKind<'a>, position: usize },
}

/// Result of tokenizing a template.
#[derive(Debug, Default)]
pub(super) struct Lexed<'a> {
    pub tokens: Vec<Token<'a>>,
    /// Byte positions of `{{` sequences that were not tags.
    pub literal_openers: Vec<usize>,
}

pub(super) fn tokenize(source: &str) -> Lexed<'_> {
    let mut lexed = Lexed::default();
    let mut text_start = 0;
    let mut cursor = 0;

    while let Some(offset) = source[cursor..].find("{{") {
        let open = cursor + offset;
        let body_start = open + 2;

        let tag = source[body_start..].find("}}").and_then(|len| {
            let body = &source[body_start..body_start + len];
            if body.is_empty() || body.contains(['{', '}']) {
                None
            } else {
                Some((body, body_start + len + 2))
            }
        });

        match tag {
            Some((body, end)) => {
                if text_start < open {
                    lexed.tokens.push(Token::Text(&source[text_start..open]));
                }
                let kind = if let Some(name) = body.strip_prefix('#') {
                    TagKind::Open(name)
                } else if let Some(name) = body.strip_prefix('/') {
                    TagKind::Close(name)
                } else {
                    TagKind::Placeholder(body)
                };
                lexed.tokens.push(Token::Tag {
                    kind,
                    position: open,
                });
                text_start = end;
                cursor = end;
            }
            None => {
                // Step one brace so `{{{name}}}` still finds the inner tag.
                lexed.literal_openers.push(open);
                cursor = open + 1;
            }
        }
    }

    if text_start < source.len() {
        lexed.tokens.push(Token::Text(&source[text_start..]));
    }

    lexed
}
