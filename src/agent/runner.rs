//! Agent runner with tool calling loop.

use super::tools::{parse_tool_call, ToolContext};
use crate::config::AgentPrompts;
use crate::error::{PdfragError, Result};
use crate::llm::{ChatMessage, ChatModel, StopReason, ToolResult, ToolUse};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Agent that can use tools to answer a question.
pub struct Agent {
    model: Arc<dyn ChatModel>,
    tools: ToolContext,
    max_iterations: usize,
    system_prompt: String,
}

impl Agent {
    /// Create a new agent with the given tool context and model.
    pub fn new(tools: ToolContext, model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            tools,
            max_iterations: 10,
            system_prompt: AgentPrompts::default().system,
        }
    }

    /// Set a custom system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Set maximum iterations for the agent loop.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Run the agent on a user question.
    pub async fn chat(&self, question: &str) -> Result<AgentResponse> {
        let mut messages = vec![ChatMessage::user(question)];
        let tool_specs = self.tools.definitions();

        let mut iterations = 0;
        let mut tool_calls_made = Vec::new();

        loop {
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(PdfragError::Agent(format!(
                    "Agent exceeded maximum iterations ({})",
                    self.max_iterations
                )));
            }

            debug!("Agent iteration {} ({})", iterations, self.model.model_id());

            let reply = self
                .model
                .converse(&self.system_prompt, &messages, &tool_specs)
                .await?;

            let tool_uses: Vec<ToolUse> = reply.message.tool_uses().into_iter().cloned().collect();

            if tool_uses.is_empty() {
                if reply.stop_reason == StopReason::MaxTokens {
                    warn!("Agent reply was cut off at the token limit");
                }
                return Ok(AgentResponse {
                    content: reply.message.text().trim().to_string(),
                    tool_calls: tool_calls_made,
                    iterations,
                });
            }

            let thought = reply.message.text();
            if !thought.trim().is_empty() {
                info!("Thought: {}", thought.trim());
            }
            messages.push(reply.message);

            let mut results = Vec::with_capacity(tool_uses.len());
            for tool_use in &tool_uses {
                let record = self.execute_tool_use(tool_use).await;
                results.push(ToolResult {
                    tool_use_id: tool_use.id.clone(),
                    content: record.result.clone(),
                    is_error: record.is_error,
                });
                tool_calls_made.push(record);
            }
            messages.push(ChatMessage::tool_results(results));
        }
    }

    /// Execute a single tool use and return a record of it.
    async fn execute_tool_use(&self, tool_use: &ToolUse) -> ToolCallRecord {
        let arguments = tool_use.input.to_string();
        info!("Action: {} with args: {}", tool_use.name, arguments);

        let (result, is_error) = match parse_tool_call(&tool_use.name, &tool_use.input) {
            Ok(tool) => match self.tools.execute(&tool).await {
                Ok(output) => (output, false),
                Err(e) => (format!("Tool error: {}", e), true),
            },
            Err(e) => (format!("Failed to parse tool call: {}", e), true),
        };

        info!("Observation: {}", result);

        ToolCallRecord {
            name: tool_use.name.clone(),
            arguments,
            result,
            is_error,
        }
    }
}

/// Response from an agent run.
#[derive(Debug)]
pub struct AgentResponse {
    /// The final response content from the agent.
    pub content: String,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of iterations (model calls) used.
    pub iterations: usize,
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Result returned by the tool.
    pub result: String,
    /// Whether the call failed.
    pub is_error: bool,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}
