//! The bounded tool-calling loop.

use super::{
    GenerationConfig, LanguageModel, ModelRequest, ModelResponse, ToolChoice, ToolInvocation,
    ToolInvocationResult, Turn,
};
use crate::config::AssistantPrompts;
use crate::error::{CoursewiseError, Result};
use crate::tools::{ToolDefinition, ToolRegistry};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Returned when the model gives no usable text and no tools ran.
pub const NO_RESPONSE_FALLBACK: &str =
    "I encountered an issue generating a response. Please try rephrasing your question.";

/// Returned when tools ran but the final reply has no usable text.
pub const POST_TOOL_FALLBACK: &str = "I was able to search for information but encountered an issue generating the final response. Please try rephrasing your question.";

/// Returned when a non-empty tool batch yields no results at all.
pub const TOOL_BATCH_FAILURE: &str = "Tool execution failed. Please try again.";

/// How a generation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The first reply was the answer.
    Direct,
    /// The model stopped requesting tools within the round budget.
    ToolsCompleted,
    /// The budget ran out and a tool-free final call produced the answer.
    Finalized,
    /// A model call or tool batch failed; the answer is an error message.
    Failed,
}

/// Record of a tool call made during generation.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Round the call belonged to, starting at 1.
    pub round: usize,
    /// Name of the tool called.
    pub name: String,
    /// Arguments passed to the tool, as JSON text.
    pub arguments: String,
    /// Whether the call failed.
    pub is_error: bool,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

/// Answer text plus a trace of how it was produced.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// Final answer or error message, always safe to display.
    pub answer: String,
    /// Number of model calls made.
    pub model_calls: usize,
    /// Number of tool-execution rounds started.
    pub tool_rounds: usize,
    /// Every tool call, in execution order.
    pub tool_calls: Vec<ToolCallRecord>,
    pub termination: Termination,
}

#[derive(Default)]
struct Trace {
    model_calls: usize,
    tool_rounds: usize,
    tool_calls: Vec<ToolCallRecord>,
}

impl Trace {
    fn finish(self, answer: impl Into<String>, termination: Termination) -> GenerationOutcome {
        GenerationOutcome {
            answer: answer.into(),
            model_calls: self.model_calls,
            tool_rounds: self.tool_rounds,
            tool_calls: self.tool_calls,
            termination,
        }
    }
}

/// Drives a bounded multi-round conversation with a language model.
pub struct GenerationEngine {
    model: Arc<dyn LanguageModel>,
    config: GenerationConfig,
    prompts: AssistantPrompts,
}

impl GenerationEngine {
    /// Create an engine with the default assistant prompts.
    pub fn new(model: Arc<dyn LanguageModel>, config: GenerationConfig) -> Self {
        Self {
            model,
            config,
            prompts: AssistantPrompts::default(),
        }
    }

    /// Use custom assistant prompts.
    pub fn with_prompts(mut self, prompts: AssistantPrompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// The engine's configuration.
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Answer `query`, optionally using `tools`. Never fails: every error is
    /// turned into display text.
    pub async fn generate_answer(
        &self,
        query: &str,
        history: Option<&str>,
        tools: Option<&mut ToolRegistry>,
    ) -> String {
        self.generate_with_trace(query, history, tools).await.answer
    }

    /// Like [`generate_answer`](Self::generate_answer), also reporting how
    /// many calls and rounds were used.
    #[instrument(skip(self, history, tools))]
    pub async fn generate_with_trace(
        &self,
        query: &str,
        history: Option<&str>,
        tools: Option<&mut ToolRegistry>,
    ) -> GenerationOutcome {
        let mut trace = Trace::default();
        let system = self.system_instructions(history);
        let definitions: Option<Vec<ToolDefinition>> = tools
            .as_deref()
            .filter(|registry| !registry.is_empty())
            .map(ToolRegistry::list_definitions);

        let mut turns = vec![Turn::User(query.to_string())];

        let mut response = match self
            .call_model(&system, &turns, definitions.as_deref(), &mut trace)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Initial model call failed: {}", e);
                return trace.finish(format!("Error generating response: {}", e), Termination::Failed);
            }
        };

        let registry = match tools {
            Some(registry) if response.requests_tools() => registry,
            _ => {
                let answer = response.first_text().unwrap_or(NO_RESPONSE_FALLBACK).to_string();
                return trace.finish(answer, Termination::Direct);
            }
        };

        let mut round = 0;
        while response.requests_tools() && round < self.config.max_tool_rounds {
            round += 1;
            trace.tool_rounds = round;

            let invocations: Vec<ToolInvocation> = response.tool_invocations().cloned().collect();
            info!("Tool round {}: {} call(s)", round, invocations.len());

            turns.push(Turn::Assistant(response.content));

            let results = self
                .execute_round(registry, round, &invocations, &mut trace)
                .await;
            if !batch_is_complete(&invocations, &results) {
                warn!("Tool round {} produced an incomplete batch", round);
                return trace.finish(TOOL_BATCH_FAILURE, Termination::Failed);
            }
            turns.push(Turn::ToolResults(results));

            response = match self
                .call_model(&system, &turns, definitions.as_deref(), &mut trace)
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!("Model call after tool round {} failed: {}", round, e);
                    return trace.finish(
                        format!("Error in tool execution round {}: {}", round, e),
                        Termination::Failed,
                    );
                }
            };
        }

        let termination = if response.requests_tools() {
            info!("Tool round budget ({}) exhausted, forcing a final answer", self.config.max_tool_rounds);
            turns.push(Turn::User(self.prompts.finalize.clone()));

            response = match self.call_model(&system, &turns, None, &mut trace).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Final response generation failed: {}", e);
                    return trace.finish(
                        format!("Error in final response generation: {}", e),
                        Termination::Failed,
                    );
                }
            };
            Termination::Finalized
        } else {
            Termination::ToolsCompleted
        };

        let answer = response.first_text().unwrap_or(POST_TOOL_FALLBACK).to_string();
        trace.finish(answer, termination)
    }

    fn system_instructions(&self, history: Option<&str>) -> String {
        match history {
            Some(history) if !history.is_empty() => format!(
                "{}\n\nPrevious conversation:\n{}",
                self.prompts.system, history
            ),
            _ => self.prompts.system.clone(),
        }
    }

    /// One model call under the configured deadline. Passing `tools` enables
    /// automatic tool choice; `None` sends no tools at all.
    async fn call_model(
        &self,
        system: &str,
        turns: &[Turn],
        tools: Option<&[ToolDefinition]>,
        trace: &mut Trace,
    ) -> Result<ModelResponse> {
        let request = ModelRequest {
            system,
            turns,
            tools,
            tool_choice: tools.map(|_| ToolChoice::Auto),
        };

        trace.model_calls += 1;
        debug!(
            "Model call {} ({} turns, tools: {})",
            trace.model_calls,
            turns.len(),
            tools.map_or(0, <[ToolDefinition]>::len)
        );

        tokio::time::timeout(self.config.request_timeout, self.model.complete(&request))
            .await
            .map_err(|_| CoursewiseError::Timeout(self.config.request_timeout.as_secs()))?
    }

    /// Execute a batch sequentially, in emission order. Every invocation
    /// yields exactly one result; faults become error results.
    async fn execute_round(
        &self,
        registry: &mut ToolRegistry,
        round: usize,
        invocations: &[ToolInvocation],
        trace: &mut Trace,
    ) -> Vec<ToolInvocationResult> {
        registry.clear_sources();

        let mut results = Vec::with_capacity(invocations.len());
        for invocation in invocations {
            let outcome = AssertUnwindSafe(registry.dispatch(&invocation.name, &invocation.arguments))
                .catch_unwind()
                .await;

            let (content, is_error) = match outcome {
                Ok(Ok(content)) => (content, false),
                Ok(Err(e)) => {
                    warn!("Tool '{}' failed: {}", invocation.name, e);
                    (format!("Tool execution error: {}", e), true)
                }
                Err(panic) => {
                    let detail = panic_message(panic.as_ref());
                    warn!("Tool '{}' panicked: {}", invocation.name, detail);
                    (format!("Tool execution error: {}", detail), true)
                }
            };

            trace.tool_calls.push(ToolCallRecord {
                round,
                name: invocation.name.clone(),
                arguments: invocation.arguments.to_string(),
                is_error,
            });
            results.push(ToolInvocationResult {
                call_id: invocation.id.clone(),
                content,
                is_error,
            });
        }
        results
    }
}

/// Every invocation is answered by exactly one result, in order.
fn batch_is_complete(invocations: &[ToolInvocation], results: &[ToolInvocationResult]) -> bool {
    !results.is_empty()
        && results.len() == invocations.len()
        && results
            .iter()
            .zip(invocations)
            .all(|(result, invocation)| result.call_id == invocation.id)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "tool panicked".to_string())
}
