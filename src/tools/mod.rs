//! Tool schemas, the Tool Schema Registry and the invocation protocol.
//!
//! - **Schema**: declarative [`ToolPromptSchema`] and its validation
//! - **Registry**: ordered, feature-gated set of schemas for one builder
//! - **Definitions**: the built-in tools
//! - **Call**: the typed [`ToolCall`] union and [`ChatTool`] snapshot
//! - **Parser**: wire format to [`ToolCall`]

pub mod call;
pub mod definitions;
pub mod parser;
pub mod registry;
pub mod schema;

pub use call::{ChatTool, FileEditAction, ServerCommand, ToolCall, ToolName};
pub use definitions::{default_tools, definition, exit_agent};
pub use parser::{ParseError, parse_tool_call};
pub use registry::ToolRegistry;
pub use schema::{Requirement, ToolExample, ToolParameter, ToolPromptSchema};
