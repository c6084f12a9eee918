//! [`LanguageModel`] backed by the OpenAI chat completions API.

use super::{
    ContentItem, GenerationConfig, LanguageModel, ModelRequest, ModelResponse, StopReason,
    ToolChoice, ToolInvocation, Turn,
};
use crate::error::{CoursewiseError, Result};
use crate::openai::create_client_with_timeout;
use crate::tools::ToolDefinition;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolChoiceOption, ChatCompletionToolType,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs, FinishReason, FunctionCall,
    FunctionObject,
};
use async_openai::Client;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

fn build_error(e: impl std::fmt::Display) -> CoursewiseError {
    CoursewiseError::OpenAI(e.to_string())
}

/// Chat model served by OpenAI.
pub struct OpenAIModel {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAIModel {
    /// Create a model client from the generation configuration.
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(config.request_timeout)?,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn build_request(&self, request: &ModelRequest<'_>) -> Result<CreateChatCompletionRequest> {
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(to_messages(request.system, request.turns)?)
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens);

        if let Some(tools) = request.tools {
            builder.tools(tools.iter().map(to_tool).collect::<Vec<_>>());
        }
        if let Some(choice) = request.tool_choice {
            builder.tool_choice(match choice {
                ToolChoice::Auto => ChatCompletionToolChoiceOption::Auto,
            });
        }

        builder.build().map_err(build_error)
    }
}

#[async_trait]
impl LanguageModel for OpenAIModel {
    async fn complete(&self, request: &ModelRequest<'_>) -> Result<ModelResponse> {
        let body = self.build_request(request)?;

        debug!(
            "Sending {} messages to {}",
            body.messages.len(),
            self.model
        );

        let response = self
            .client
            .chat()
            .create(body)
            .await
            .map_err(|e| CoursewiseError::OpenAI(e.to_string()))?;

        let Some(choice) = response.choices.into_iter().next() else {
            warn!("Model returned no choices");
            return Ok(ModelResponse {
                stop_reason: StopReason::Other,
                content: Vec::new(),
            });
        };

        let mut content = Vec::new();
        if let Some(text) = choice.message.content {
            content.push(ContentItem::Text(text));
        }
        for call in choice.message.tool_calls.unwrap_or_default() {
            content.push(ContentItem::ToolCall(from_tool_call(call)));
        }

        Ok(ModelResponse {
            stop_reason: stop_reason(choice.finish_reason),
            content,
        })
    }
}

fn stop_reason(reason: Option<FinishReason>) -> StopReason {
    match reason {
        Some(FinishReason::ToolCalls) | Some(FinishReason::FunctionCall) => StopReason::ToolUse,
        Some(FinishReason::Stop) => StopReason::EndTurn,
        Some(FinishReason::Length) => StopReason::MaxTokens,
        _ => StopReason::Other,
    }
}

fn to_tool(definition: &ToolDefinition) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: definition.name.clone(),
            description: Some(definition.description.clone()),
            parameters: Some(definition.input_schema.clone()),
            strict: None,
        },
    }
}

/// Arguments arrive as JSON text; anything unparseable is passed on as a
/// string so schema validation can reject it.
fn from_tool_call(call: ChatCompletionMessageToolCall) -> ToolInvocation {
    let arguments = serde_json::from_str(&call.function.arguments)
        .unwrap_or(Value::String(call.function.arguments));

    ToolInvocation {
        id: call.id,
        name: call.function.name,
        arguments,
    }
}

fn to_tool_call(invocation: &ToolInvocation) -> ChatCompletionMessageToolCall {
    ChatCompletionMessageToolCall {
        id: invocation.id.clone(),
        r#type: ChatCompletionToolType::Function,
        function: FunctionCall {
            name: invocation.name.clone(),
            arguments: invocation.arguments.to_string(),
        },
    }
}

fn to_messages(system: &str, turns: &[Turn]) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut messages: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(system)
            .build()
            .map_err(build_error)?
            .into(),
    ];

    for turn in turns {
        match turn {
            Turn::User(text) => messages.push(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(text.as_str())
                    .build()
                    .map_err(build_error)?
                    .into(),
            ),
            Turn::Assistant(items) => {
                let text: String = items
                    .iter()
                    .filter_map(|item| match item {
                        ContentItem::Text(text) => Some(text.as_str()),
                        ContentItem::ToolCall(_) => None,
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                let calls: Vec<ChatCompletionMessageToolCall> = items
                    .iter()
                    .filter_map(|item| match item {
                        ContentItem::ToolCall(invocation) => Some(to_tool_call(invocation)),
                        ContentItem::Text(_) => None,
                    })
                    .collect();

                let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
                if !text.is_empty() {
                    builder.content(text);
                }
                if !calls.is_empty() {
                    builder.tool_calls(calls);
                }
                messages.push(builder.build().map_err(build_error)?.into());
            }
            Turn::ToolResults(results) => {
                for result in results {
                    messages.push(
                        ChatCompletionRequestToolMessageArgs::default()
                            .tool_call_id(result.call_id.as_str())
                            .content(result.content.as_str())
                            .build()
                            .map_err(build_error)?
                            .into(),
                    );
                }
            }
        }
    }

    Ok(messages)
}
