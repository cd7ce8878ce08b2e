//! Wire-format parser for tool invocations.
//!
//! A model turn may contain at most one invocation:
//!
//! ```text
//! <read_file>
//! <path>src/main.rs</path>
//! </read_file>
//! ```
//!
//! The invocation may sit inside wrapper tags (`<kodu_action>`) and be
//! surrounded by prose. Parameters are matched by the names the tool's schema
//! declares; other child elements are ignored. Scanning is sequential, so a
//! parameter value (a file body, say) is never searched for further tags.

use super::call::{FileEditAction, ServerCommand, ToolCall, ToolName};
use super::registry::ToolRegistry;
use super::schema::{Requirement, ToolPromptSchema};
use crate::agent::AgentRole;
use crate::error::KoduError;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Why a model response is not an acceptable invocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("response contains more than one tool call ({}); send exactly one per message", .names.join(", "))]
    MultipleToolCalls { names: Vec<String> },

    #[error("tool call '<{tool}>' is never closed with '</{tool}>'")]
    UnclosedTool { tool: String },

    #[error("tool '{tool}' is not available to this agent")]
    UnavailableTool { tool: String },

    #[error("invalid parameter '{parameter}' for tool '{tool}': {reason}")]
    InvalidParameter {
        tool: String,
        parameter: String,
        reason: String,
    },
}

impl From<ParseError> for KoduError {
    fn from(err: ParseError) -> Self {
        KoduError::ProtocolViolation(err.to_string())
    }
}

/// Parameter whose value is kept verbatim apart from one leading newline.
const VERBATIM_PARAMETER: &str = "kodu_content";

/// Parse the single tool call in `response`.
///
/// Returns `Ok(None)` for a plain-text turn. Built-in tool names are always
/// recognized so that a call to a tool outside `registry` is reported rather
/// than treated as prose.
pub fn parse_tool_call(
    response: &str,
    registry: &ToolRegistry,
) -> Result<Option<ToolCall>, ParseError> {
    let mut known: Vec<&str> = ToolName::ALL.iter().map(|t| t.as_str()).collect();
    for name in registry.names() {
        if !known.contains(&name) {
            known.push(name);
        }
    }

    let mut found: Vec<(&str, &str)> = Vec::new();
    let mut cursor = 0;
    while let Some(element) = next_element(response, cursor, &known) {
        match element {
            Element::Unclosed(name) => {
                return Err(ParseError::UnclosedTool {
                    tool: name.to_string(),
                });
            }
            Element::Closed { name, body, end } => {
                found.push((name, body));
                cursor = end;
            }
        }
    }

    if found.len() > 1 {
        return Err(ParseError::MultipleToolCalls {
            names: found.iter().map(|(name, _)| name.to_string()).collect(),
        });
    }
    let Some((name, body)) = found.pop() else {
        return Ok(None);
    };

    let schema = registry
        .get(name)
        .ok_or_else(|| ParseError::UnavailableTool {
            tool: name.to_string(),
        })?;

    let params = extract_parameters(schema, body)?;
    build_call(schema, params).map(Some)
}

enum Element<'t, 'n> {
    Closed {
        name: &'n str,
        body: &'t str,
        end: usize,
    },
    Unclosed(&'n str),
}

/// Find the earliest `<name>` at or after `from` and its first matching close.
fn next_element<'t, 'n>(
    text: &'t str,
    from: usize,
    names: &[&'n str],
) -> Option<Element<'t, 'n>> {
    let (start, name) = names
        .iter()
        .filter_map(|name| {
            text[from..]
                .find(&format!("<{}>", name))
                .map(|offset| (from + offset, *name))
        })
        .min_by_key(|(start, _)| *start)?;

    let body_start = start + name.len() + 2;
    let close = format!("</{}>", name);
    let element = match text[body_start..].find(&close) {
        Some(offset) => Element::Closed {
            name,
            body: &text[body_start..body_start + offset],
            end: body_start + offset + close.len(),
        },
        None => Element::Unclosed(name),
    };
    Some(element)
}

fn extract_parameters<'a>(
    schema: &'a ToolPromptSchema,
    body: &str,
) -> Result<HashMap<&'a str, String>, ParseError> {
    let declared: Vec<&str> = schema.parameters.iter().map(|p| p.name.as_str()).collect();
    let mut values = HashMap::new();
    let mut cursor = 0;

    while let Some(element) = next_element(body, cursor, &declared) {
        match element {
            Element::Unclosed(name) => {
                return Err(invalid(&schema.name, name, "element is never closed"));
            }
            Element::Closed { name, body: raw, end } => {
                let value = if name == VERBATIM_PARAMETER {
                    raw.strip_prefix("\r\n")
                        .or_else(|| raw.strip_prefix('\n'))
                        .unwrap_or(raw)
                        .to_string()
                } else {
                    raw.trim().to_string()
                };
                if values.insert(name, value).is_some() {
                    return Err(invalid(&schema.name, name, "given more than once"));
                }
                cursor = end;
            }
        }
    }

    for param in &schema.parameters {
        let present = values
            .get(param.name.as_str())
            .is_some_and(|v| !v.trim().is_empty());
        if param.required == Requirement::Required && !present {
            return Err(invalid(&schema.name, &param.name, "missing required value"));
        }
    }

    Ok(values)
}

fn invalid(tool: &str, parameter: &str, reason: &str) -> ParseError {
    ParseError::InvalidParameter {
        tool: tool.to_string(),
        parameter: parameter.to_string(),
        reason: reason.to_string(),
    }
}

struct Params<'a> {
    tool: &'a str,
    values: HashMap<&'a str, String>,
}

impl Params<'_> {
    fn take(&mut self, name: &str) -> Option<String> {
        self.values.remove(name).filter(|v| !v.trim().is_empty())
    }

    fn require(&mut self, name: &str) -> Result<String, ParseError> {
        self.take(name)
            .ok_or_else(|| invalid(self.tool, name, "missing required value"))
    }

    fn invalid(&self, name: &str, reason: impl Into<String>) -> ParseError {
        invalid(self.tool, name, &reason.into())
    }
}

fn build_call(
    schema: &ToolPromptSchema,
    values: HashMap<&str, String>,
) -> Result<ToolCall, ParseError> {
    let mut p = Params {
        tool: &schema.name,
        values,
    };

    let Ok(tool) = schema.name.parse::<ToolName>() else {
        let params: BTreeMap<String, String> = p
            .values
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        return Ok(ToolCall::Custom {
            name: schema.name.clone(),
            params,
        });
    };

    let call = match tool {
        ToolName::ReadFile => ToolCall::ReadFile {
            path: p.require("path")?,
        },
        ToolName::SearchFiles => ToolCall::SearchFiles {
            path: p.require("path")?,
            regex: p.require("regex")?,
            file_pattern: p.take("filePattern"),
        },
        ToolName::ExecuteCommand => ToolCall::ExecuteCommand {
            command: p.require("command")?,
        },
        ToolName::ListFiles => {
            let path = p.require("path")?;
            let recursive = match p.take("recursive").map(|v| v.to_ascii_lowercase()) {
                None => false,
                Some(v) if v == "true" => true,
                Some(v) if v == "false" => false,
                Some(v) => {
                    return Err(p.invalid(
                        "recursive",
                        format!("expected 'true' or 'false', got '{}'", v),
                    ));
                }
            };
            ToolCall::ListFiles { path, recursive }
        }
        ToolName::FileEditor => {
            let path = p.require("path")?;
            let mode = p.require("mode")?;
            let edit = match mode.as_str() {
                "whole_write" => FileEditAction::WholeWrite {
                    content: p.require("kodu_content")?,
                    commit_message: p.require("commit_message")?,
                },
                "edit" => FileEditAction::Edit {
                    diff: p.require("kodu_diff")?,
                    commit_message: p.require("commit_message")?,
                },
                "rollback" => FileEditAction::Rollback,
                "list_versions" => FileEditAction::ListVersions,
                other => {
                    return Err(p.invalid("mode", format!("unknown mode '{}'", other)));
                }
            };
            ToolCall::FileEditor { path, edit }
        }
        ToolName::AskFollowupQuestion => ToolCall::AskFollowupQuestion {
            question: p.require("question")?,
        },
        ToolName::SearchSymbol => ToolCall::SearchSymbol {
            symbol_name: p.require("symbolName")?,
            path: p.require("path")?,
        },
        ToolName::UrlScreenshot => ToolCall::UrlScreenshot {
            url: p.require("url")?,
        },
        ToolName::AttemptCompletion => ToolCall::AttemptCompletion {
            result: p.require("result")?,
        },
        ToolName::ExploreRepoFolder => ToolCall::ExploreRepoFolder {
            path: p.require("path")?,
        },
        ToolName::SpawnAgent => {
            let raw = p.require("agentName")?;
            let agent = raw
                .parse::<AgentRole>()
                .map_err(|_| p.invalid("agentName", format!("unknown agent '{}'", raw)))?;
            let files = p
                .take("files")
                .map(|list| {
                    list.split(',')
                        .map(str::trim)
                        .filter(|f| !f.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            ToolCall::SpawnAgent {
                agent,
                instructions: p.require("instructions")?,
                files,
            }
        }
        ToolName::ServerRunner => {
            let raw = p.require("commandType")?;
            let command_type = raw.parse::<ServerCommand>().map_err(|_| {
                p.invalid(
                    "commandType",
                    format!("expected start, stop, restart or getLogs, got '{}'", raw),
                )
            })?;
            let server_name = p.require("serverName")?;
            let command_to_run = p.take("commandToRun");
            if matches!(command_type, ServerCommand::Start | ServerCommand::Restart)
                && command_to_run.is_none()
            {
                return Err(p.invalid("commandToRun", "required for start and restart"));
            }
            let lines = match p.take("lines") {
                None => None,
                Some(v) => Some(v.parse::<u32>().map_err(|_| {
                    p.invalid("lines", format!("expected a line count, got '{}'", v))
                })?),
            };
            ToolCall::ServerRunner {
                command_type,
                server_name,
                command_to_run,
                lines,
            }
        }
        ToolName::AddInterestedFile => ToolCall::AddInterestedFile {
            path: p.require("path")?,
            why: p.require("why")?,
        },
        ToolName::ExitAgent => ToolCall::ExitAgent {
            result: p.require("result")?,
        },
    };

    Ok(call)
}
