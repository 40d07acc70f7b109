//! Agent system for answering questions with tool calling.
//!
//! Provides an LLM agent that can add, multiply and query the indexed
//! documents to answer a natural-language question.

mod runner;
mod tools;

pub use runner::{Agent, AgentResponse, ToolCallRecord};
pub use tools::{add, multiply, parse_tool_call, tool_definitions, ToolCall, ToolContext, QUERY_TOOL_NAME};
