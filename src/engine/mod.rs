//! Tool-orchestrated answer generation.
//!
//! The [`GenerationEngine`] drives a bounded conversation with a
//! [`LanguageModel`]: the model may answer directly or request tool
//! invocations, which are executed through a
//! [`ToolRegistry`](crate::tools::ToolRegistry) and fed back until the
//! model stops asking or the round budget runs out.

mod generator;
mod openai;

pub use generator::{GenerationEngine, GenerationOutcome, Termination, ToolCallRecord};
pub use openai::OpenAIModel;

use crate::config::GenerationSettings;
use crate::error::Result;
use crate::tools::ToolDefinition;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    /// Opaque id used to correlate the result.
    pub id: String,
    /// Name of the tool to run.
    pub name: String,
    /// Structured arguments as produced by the model.
    pub arguments: Value,
}

/// One item of model output.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentItem {
    Text(String),
    ToolCall(ToolInvocation),
}

/// Outcome of one tool invocation, sent back to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocationResult {
    /// Id of the invocation this answers.
    pub call_id: String,
    pub content: String,
    pub is_error: bool,
}

/// Speaker of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the per-query conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    /// Plain user text.
    User(String),
    /// Model output, replayed verbatim (text and tool requests).
    Assistant(Vec<ContentItem>),
    /// Results for every request of the preceding assistant turn, in order.
    ToolResults(Vec<ToolInvocationResult>),
}

impl Turn {
    pub fn role(&self) -> Role {
        match self {
            Turn::User(_) | Turn::ToolResults(_) => Role::User,
            Turn::Assistant(_) => Role::Assistant,
        }
    }
}

/// Whether the model may choose to call tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChoice {
    /// The model decides.
    Auto,
}

/// Why the model stopped producing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    ToolUse,
    EndTurn,
    MaxTokens,
    Other,
}

/// A single model call.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub system: &'a str,
    pub turns: &'a [Turn],
    /// Tools offered to the model; `None` forces a textual answer.
    pub tools: Option<&'a [ToolDefinition]>,
    pub tool_choice: Option<ToolChoice>,
}

/// The model's reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    pub stop_reason: StopReason,
    pub content: Vec<ContentItem>,
}

impl ModelResponse {
    /// A plain text reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            stop_reason: StopReason::EndTurn,
            content: vec![ContentItem::Text(text.into())],
        }
    }

    /// A reply consisting only of tool requests.
    pub fn tool_calls(invocations: Vec<ToolInvocation>) -> Self {
        Self {
            stop_reason: StopReason::ToolUse,
            content: invocations.into_iter().map(ContentItem::ToolCall).collect(),
        }
    }

    /// Tool requests in the order the model emitted them.
    pub fn tool_invocations(&self) -> impl Iterator<Item = &ToolInvocation> {
        self.content.iter().filter_map(|item| match item {
            ContentItem::ToolCall(invocation) => Some(invocation),
            ContentItem::Text(_) => None,
        })
    }

    /// Whether the reply asks for at least one tool.
    pub fn requests_tools(&self) -> bool {
        self.tool_invocations().next().is_some()
    }

    /// The first text item that is not blank.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|item| match item {
            ContentItem::Text(text) if !text.trim().is_empty() => Some(text.as_str()),
            ContentItem::Text(_) | ContentItem::ToolCall(_) => None,
        })
    }
}

/// A chat model that supports tool calling.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: &ModelRequest<'_>) -> Result<ModelResponse>;
}

/// Immutable call-shape parameters for the engine and the model client.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Maximum tool-execution rounds per query.
    pub max_tool_rounds: usize,
    /// Deadline applied to every model call.
    pub request_timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::from(&GenerationSettings::default())
    }
}

impl From<&GenerationSettings> for GenerationConfig {
    fn from(settings: &GenerationSettings) -> Self {
        Self {
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            max_tool_rounds: settings.max_tool_rounds,
            request_timeout: settings.request_timeout(),
        }
    }
}
