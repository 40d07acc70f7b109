//! Bedrock Converse API implementation of [`ChatModel`].

use super::{ChatMessage, ChatModel, ChatReply, ContentPart, Role, StopReason, ToolSpec, ToolUse};
use crate::bedrock::{document_to_json, json_to_document};
use crate::config::BedrockSettings;
use crate::error::{PdfragError, Result};
use async_trait::async_trait;
use aws_sdk_bedrockruntime::error::{BuildError, DisplayErrorContext};
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ConversationRole, ConverseOutput, InferenceConfiguration, Message,
    StopReason as SdkStopReason, SystemContentBlock, Tool, ToolConfiguration, ToolInputSchema,
    ToolResultBlock, ToolResultContentBlock, ToolResultStatus, ToolSpecification, ToolUseBlock,
};
use aws_sdk_bedrockruntime::Client;
use tracing::{debug, instrument};

fn build_error(e: BuildError) -> PdfragError {
    PdfragError::Bedrock(format!("Invalid request: {}", e))
}

/// Chat model served by Bedrock.
pub struct BedrockChatModel {
    client: Client,
    model: String,
    temperature: f32,
    max_tokens: i32,
}

impl BedrockChatModel {
    /// Create a chat model from Bedrock settings.
    pub fn new(client: Client, settings: &BedrockSettings) -> Self {
        Self {
            client,
            model: settings.llm_model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }
}

/// Convert a crate message into the SDK type.
fn to_sdk_message(message: &ChatMessage) -> Result<Message> {
    let role = match message.role {
        Role::User => ConversationRole::User,
        Role::Assistant => ConversationRole::Assistant,
    };

    let blocks = message
        .content
        .iter()
        .map(|part| {
            Ok(match part {
                ContentPart::Text { text } => ContentBlock::Text(text.clone()),
                ContentPart::ToolUse(tool_use) => ContentBlock::ToolUse(
                    ToolUseBlock::builder()
                        .tool_use_id(&tool_use.id)
                        .name(&tool_use.name)
                        .input(json_to_document(&tool_use.input))
                        .build()
                        .map_err(build_error)?,
                ),
                ContentPart::ToolResult(result) => ContentBlock::ToolResult(
                    ToolResultBlock::builder()
                        .tool_use_id(&result.tool_use_id)
                        .content(ToolResultContentBlock::Text(result.content.clone()))
                        .status(if result.is_error {
                            ToolResultStatus::Error
                        } else {
                            ToolResultStatus::Success
                        })
                        .build()
                        .map_err(build_error)?,
                ),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Message::builder()
        .role(role)
        .set_content(Some(blocks))
        .build()
        .map_err(build_error)
}

/// Convert an SDK message into the crate type. Unsupported blocks are dropped.
fn from_sdk_message(message: &Message) -> ChatMessage {
    let role = match message.role() {
        ConversationRole::User => Role::User,
        _ => Role::Assistant,
    };

    let content = message
        .content()
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text(text) => Some(ContentPart::Text { text: text.clone() }),
            ContentBlock::ToolUse(tool_use) => Some(ContentPart::ToolUse(ToolUse {
                id: tool_use.tool_use_id().to_string(),
                name: tool_use.name().to_string(),
                input: document_to_json(tool_use.input()),
            })),
            _ => None,
        })
        .collect();

    ChatMessage { role, content }
}

fn tool_configuration(tools: &[ToolSpec]) -> Result<ToolConfiguration> {
    let tools = tools
        .iter()
        .map(|spec| {
            ToolSpecification::builder()
                .name(&spec.name)
                .description(&spec.description)
                .input_schema(ToolInputSchema::Json(json_to_document(&spec.input_schema)))
                .build()
                .map(Tool::ToolSpec)
                .map_err(build_error)
        })
        .collect::<Result<Vec<_>>>()?;

    ToolConfiguration::builder()
        .set_tools(Some(tools))
        .build()
        .map_err(build_error)
}

fn stop_reason(reason: &SdkStopReason) -> StopReason {
    match reason {
        SdkStopReason::EndTurn | SdkStopReason::StopSequence => StopReason::EndTurn,
        SdkStopReason::ToolUse => StopReason::ToolUse,
        SdkStopReason::MaxTokens => StopReason::MaxTokens,
        other => StopReason::Other(other.as_str().to_string()),
    }
}

#[async_trait]
impl ChatModel for BedrockChatModel {
    #[instrument(skip(self, system, messages, tools), fields(model = %self.model, messages = messages.len()))]
    async fn converse(
        &self,
        system: &str,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ChatReply> {
        let sdk_messages = messages
            .iter()
            .map(to_sdk_message)
            .collect::<Result<Vec<_>>>()?;

        let mut request = self
            .client
            .converse()
            .model_id(&self.model)
            .set_messages(Some(sdk_messages))
            .inference_config(
                InferenceConfiguration::builder()
                    .temperature(self.temperature)
                    .max_tokens(self.max_tokens)
                    .build(),
            );

        if !system.is_empty() {
            request = request.system(SystemContentBlock::Text(system.to_string()));
        }
        if !tools.is_empty() {
            request = request.tool_config(tool_configuration(tools)?);
        }

        let response = request.send().await.map_err(|e| {
            PdfragError::Bedrock(format!("Converse call failed: {}", DisplayErrorContext(e)))
        })?;

        if let Some(usage) = response.usage() {
            debug!(
                "Tokens: {} in, {} out",
                usage.input_tokens(),
                usage.output_tokens()
            );
        }

        let message = match response.output() {
            Some(ConverseOutput::Message(message)) => from_sdk_message(message),
            _ => return Err(PdfragError::Bedrock("No message in model response".to_string())),
        };

        Ok(ChatReply {
            message,
            stop_reason: stop_reason(response.stop_reason()),
        })
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolResult;
    use serde_json::json;

    #[test]
    fn test_message_round_trip_through_sdk() {
        let message = ChatMessage {
            role: Role::Assistant,
            content: vec![
                ContentPart::Text { text: "Adding.".to_string() },
                ContentPart::ToolUse(ToolUse {
                    id: "tooluse_1".to_string(),
                    name: "add".to_string(),
                    input: json!({"a": 2, "b": 3.5}),
                }),
            ],
        };

        let sdk = to_sdk_message(&message).unwrap();
        assert_eq!(sdk.role(), &ConversationRole::Assistant);
        assert_eq!(sdk.content().len(), 2);
        assert_eq!(from_sdk_message(&sdk), message);
    }

    #[test]
    fn test_tool_result_status() {
        let message = ChatMessage::tool_results(vec![ToolResult {
            tool_use_id: "tooluse_1".to_string(),
            content: "Unknown tool: divide".to_string(),
            is_error: true,
        }]);

        let sdk = to_sdk_message(&message).unwrap();
        match &sdk.content()[0] {
            ContentBlock::ToolResult(result) => {
                assert_eq!(result.tool_use_id(), "tooluse_1");
                assert_eq!(result.status(), Some(&ToolResultStatus::Error));
            }
            other => panic!("Expected tool result, got {:?}", other),
        }
    }

    #[test]
    fn test_tool_configuration() {
        let specs = vec![ToolSpec {
            name: "multiply".to_string(),
            description: "Multiply two numbers".to_string(),
            input_schema: json!({"type": "object", "properties": {"a": {"type": "number"}}}),
        }];

        let config = tool_configuration(&specs).unwrap();
        assert_eq!(config.tools().len(), 1);
        match &config.tools()[0] {
            Tool::ToolSpec(spec) => assert_eq!(spec.name(), "multiply"),
            other => panic!("Expected tool spec, got {:?}", other),
        }
    }

    #[test]
    fn test_stop_reason_mapping() {
        assert_eq!(stop_reason(&SdkStopReason::ToolUse), StopReason::ToolUse);
        assert_eq!(stop_reason(&SdkStopReason::EndTurn), StopReason::EndTurn);
        assert_eq!(
            stop_reason(&SdkStopReason::GuardrailIntervened),
            StopReason::Other("guardrail_intervened".to_string())
        );
    }
}
