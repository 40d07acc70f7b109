//! Tool definitions and implementations for the agent system.

use crate::error::{PdfragError, Result};
use crate::llm::ToolSpec;
use crate::rag::QueryEngine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Name of the retrieval tool.
pub const QUERY_TOOL_NAME: &str = "query_documents";

/// Available tools for the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ToolCall {
    /// Add two numbers.
    Add { a: f64, b: f64 },

    /// Multiply two numbers.
    Multiply { a: f64, b: f64 },

    /// Ask the query engine a question about the documents.
    QueryDocuments { input: String },
}

/// Add two numbers.
pub fn add(a: f64, b: f64) -> f64 {
    a + b
}

/// Multiply two numbers.
pub fn multiply(a: f64, b: f64) -> f64 {
    a * b
}

/// Tool execution context with access to the query engine.
pub struct ToolContext {
    query_engine: Arc<QueryEngine>,
    query_tool_description: String,
}

impl ToolContext {
    /// Create a new tool context.
    pub fn new(query_engine: Arc<QueryEngine>) -> Self {
        Self {
            query_engine,
            query_tool_description: crate::config::AgentPrompts::default().query_tool_description,
        }
    }

    /// Override the description the model sees for the retrieval tool.
    pub fn with_query_tool_description(mut self, description: &str) -> Self {
        self.query_tool_description = description.to_string();
        self
    }

    /// Tool specs to advertise to the model.
    pub fn definitions(&self) -> Vec<ToolSpec> {
        tool_definitions(&self.query_tool_description)
    }

    /// Execute a tool call and return the result as a string.
    pub async fn execute(&self, tool: &ToolCall) -> Result<String> {
        match tool {
            ToolCall::Add { a, b } => Ok(format_number(add(*a, *b))),
            ToolCall::Multiply { a, b } => Ok(format_number(multiply(*a, *b))),
            ToolCall::QueryDocuments { input } => {
                let response = self.query_engine.query(input).await?;
                Ok(response.answer)
            }
        }
    }
}

/// Render a number without a trailing `.0` for whole values.
fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn number_pair_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "a": {"type": "number", "description": "First number"},
            "b": {"type": "number", "description": "Second number"}
        },
        "required": ["a", "b"]
    })
}

/// Tool specs for the agent.
pub fn tool_definitions(query_tool_description: &str) -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "add".to_string(),
            description: "Add two numbers and return the sum.".to_string(),
            input_schema: number_pair_schema(),
        },
        ToolSpec {
            name: "multiply".to_string(),
            description: "Multiply two numbers and return the product.".to_string(),
            input_schema: number_pair_schema(),
        },
        ToolSpec {
            name: QUERY_TOOL_NAME.to_string(),
            description: query_tool_description.to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "input": {
                        "type": "string",
                        "description": "A self-contained question about the documents"
                    }
                },
                "required": ["input"]
            }),
        },
    ]
}

/// Parse a tool call from the model's tool-use block.
pub fn parse_tool_call(name: &str, input: &serde_json::Value) -> Result<ToolCall> {
    let number = |key: &str| {
        input[key]
            .as_f64()
            .ok_or_else(|| PdfragError::Agent(format!("Missing or non-numeric '{}' argument", key)))
    };

    match name {
        "add" => Ok(ToolCall::Add {
            a: number("a")?,
            b: number("b")?,
        }),
        "multiply" => Ok(ToolCall::Multiply {
            a: number("a")?,
            b: number("b")?,
        }),
        QUERY_TOOL_NAME => {
            let input = input["input"]
                .as_str()
                .ok_or_else(|| PdfragError::Agent("Missing 'input' argument".to_string()))?
                .to_string();
            Ok(ToolCall::QueryDocuments { input })
        }
        _ => Err(PdfragError::Agent(format!("Unknown tool: {}", name))),
    }
}
