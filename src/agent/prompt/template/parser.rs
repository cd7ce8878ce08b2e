//! Recursive-descent parse of a validated token stream into a template AST.

use super::lexer::{Lexed, TagKind, Token};
use super::vocabulary::{ConditionalBlock, Placeholder};

/// A node of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Placeholder(Placeholder),
    Block {
        flag: ConditionalBlock,
        children: Vec<Node>,
    },
}

/// Build the AST. The token stream must already have passed validation;
/// any tag that does not resolve against the vocabulary is skipped.
pub(super) fn parse_tokens(lexed: &Lexed<'_>) -> Vec<Node> {
    let mut index = 0;
    parse_nodes(&lexed.tokens, &mut index)
}

fn parse_nodes(tokens: &[Token<'_>], index: &mut usize) -> Vec<Node> {
    let mut nodes: Vec<Node> = Vec::new();

    while let Some(token) = tokens.get(*index) {
        *index += 1;
        match *token {
            Token::Text(text) => push_text(&mut nodes, text),
            Token::Tag { kind, .. } => match kind {
                TagKind::Placeholder(name) => {
                    if let Ok(placeholder) = name.parse() {
                        nodes.push(Node::Placeholder(placeholder));
                    }
                }
                TagKind::Open(name) => {
                    let children = parse_nodes(tokens, index);
                    if let Ok(flag) = name.parse() {
                        nodes.push(Node::Block { flag, children });
                    }
                }
                TagKind::Close(_) => return nodes,
            },
        }
    }

    nodes
}

/// Append text, merging with a preceding text node.
fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(last)) = nodes.last_mut() {
        last.push_str(text);
    } else {
        nodes.push(Node::Text(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::super::lexer::tokenize;
    use super::*;

    fn parse(source: &str) -> Vec<Node> {
        parse_tokens(&tokenize(source))
    }

    #[test]
    fn parses_flat_template() {
        assert_eq!(
            parse("I am {{agentName}}."),
            vec![
                Node::Text("I am ".to_string()),
                Node::Placeholder(Placeholder::AgentName),
                Node::Text(".".to_string()),
            ]
        );
    }

    #[test]
    fn parses_nested_blocks() {
        let nodes = parse("a{{#vision}}b{{#vision}}c{{/vision}}{{/vision}}d");
        assert_eq!(
            nodes,
            vec![
                Node::Text("a".to_string()),
                Node::Block {
                    flag: ConditionalBlock::Vision,
                    children: vec![
                        Node::Text("b".to_string()),
                        Node::Block {
                            flag: ConditionalBlock::Vision,
                            children: vec![Node::Text("c".to_string())],
                        },
                    ],
                },
                Node::Text("d".to_string()),
            ]
        );
    }

    #[test]
    fn literal_braces_stay_in_text() {
        assert_eq!(
            parse("{{{cwd}}}"),
            vec![
                Node::Text("{".to_string()),
                Node::Placeholder(Placeholder::Cwd),
                Node::Text("}".to_string()),
            ]
        );
    }
}
