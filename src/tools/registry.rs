//! Registry of the tools available to a query.

use super::{Source, Tool, ToolDefinition};
use crate::error::ToolError;
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

struct RegisteredTool {
    tool: Arc<dyn Tool>,
    definition: ToolDefinition,
    validator: Option<Arc<JSONSchema>>,
    /// Sources produced by this tool since the last `clear_sources`.
    sources: Vec<Source>,
}

impl RegisteredTool {
    fn new(tool: Arc<dyn Tool>) -> Self {
        let definition = tool.definition();
        let validator = match JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&definition.input_schema)
        {
            Ok(schema) => Some(Arc::new(schema)),
            Err(e) => {
                warn!(
                    "Schema for tool '{}' does not compile, arguments will not be validated: {}",
                    definition.name, e
                );
                None
            }
        };

        Self {
            tool,
            definition,
            validator,
            sources: Vec::new(),
        }
    }

    fn validate(&self, arguments: &Value) -> Result<(), ToolError> {
        let Some(validator) = &self.validator else {
            return Ok(());
        };

        validator.validate(arguments).map_err(|errors| {
            let reason = errors.map(|e| e.to_string()).collect::<Vec<_>>().join("; ");
            ToolError::InvalidArguments {
                tool: self.definition.name.clone(),
                reason,
            }
        })
    }
}

/// Holds tools by name and tracks the sources of their latest executions.
///
/// Registration order is preserved: definitions and sources are always
/// reported in that order. Executing needs `&mut self`, so a registry serves
/// one query at a time; use [`ToolRegistry::fork`] to give each concurrent
/// query its own source buffers.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its definition name.
    ///
    /// Registering a second tool with the same name replaces the first in
    /// place (last write wins).
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let entry = RegisteredTool::new(tool);

        match self
            .tools
            .iter_mut()
            .find(|t| t.definition.name == entry.definition.name)
        {
            Some(existing) => {
                debug!("Replacing registered tool '{}'", entry.definition.name);
                *existing = entry;
            }
            None => {
                debug!("Registered tool '{}'", entry.definition.name);
                self.tools.push(entry);
            }
        }
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions of all registered tools, in registration order.
    pub fn list_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition.clone()).collect()
    }

    /// Execute a tool by name, surfacing faults as errors.
    ///
    /// Arguments are validated against the tool's schema before the tool
    /// runs. On success the tool's sources are appended to its buffer.
    pub async fn dispatch(&mut self, name: &str, arguments: &Value) -> Result<String, ToolError> {
        let entry = self
            .tools
            .iter_mut()
            .find(|t| t.definition.name == name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        entry.validate(arguments)?;

        info!("Executing tool: {} with args: {}", name, arguments);
        let output = entry.tool.execute(arguments).await?;

        entry.sources.extend(output.sources);
        Ok(output.content)
    }

    /// Execute a tool by name, always producing display text.
    ///
    /// Unknown names yield `Tool '<name>' not found`.
    pub async fn execute(&mut self, name: &str, arguments: &Value) -> String {
        match self.dispatch(name, arguments).await {
            Ok(content) => content,
            Err(e @ ToolError::NotFound(_)) => e.to_string(),
            Err(e) => format!("Tool execution error: {}", e),
        }
    }

    /// Sources from every tool's buffer, in registration order.
    pub fn collect_sources(&self) -> Vec<Source> {
        self.tools
            .iter()
            .flat_map(|t| t.sources.iter().cloned())
            .collect()
    }

    /// Empty every tool's source buffer.
    pub fn clear_sources(&mut self) {
        for entry in &mut self.tools {
            entry.sources.clear();
        }
    }

    /// A registry with the same tools and empty source buffers.
    pub fn fork(&self) -> Self {
        Self {
            tools: self
                .tools
                .iter()
                .map(|t| RegisteredTool {
                    tool: Arc::clone(&t.tool),
                    definition: t.definition.clone(),
                    validator: t.validator.clone(),
                    sources: Vec::new(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolOutput;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoTool {
        name: &'static str,
        calls: AtomicUsize,
    }

    impl EchoTool {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new(
                self.name,
                "Echo the query",
                json!({
                    "type": "object",
                    "properties": {"query": {"type": "string"}},
                    "required": ["query"]
                }),
            )
        }

        async fn execute(&self, arguments: &Value) -> Result<ToolOutput, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let query = arguments["query"].as_str().unwrap_or_default();
            Ok(ToolOutput::with_sources(
                format!("echo: {}", query),
                vec![Source::new(format!("{} - {}", self.name, query), None)],
            ))
        }
    }

    #[tokio::test]
    async fn test_execute_delegates_exactly_once() {
        let tool = EchoTool::new("echo");
        let mut registry = ToolRegistry::new();
        registry.register(tool.clone());

        let result = registry.execute("echo", &json!({"query": "hi"})).await;
        assert_eq!(result, "echo: hi");
        assert_eq!(tool.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_returns_sentinel() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool::new("echo"));

        let result = registry
            .execute("nonexistent_tool", &json!({"query": "test"}))
            .await;
        assert_eq!(result, "Tool 'nonexistent_tool' not found");

        let err = registry.dispatch("nonexistent_tool", &json!({})).await.unwrap_err();
        assert_eq!(err, ToolError::NotFound("nonexistent_tool".to_string()));
    }

    #[tokio::test]
    async fn test_schema_violation_never_reaches_tool() {
        let tool = EchoTool::new("echo");
        let mut registry = ToolRegistry::new();
        registry.register(tool.clone());

        let err = registry.dispatch("echo", &json!({"query": 42})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));

        let missing = registry.execute("echo", &json!({})).await;
        assert!(missing.starts_with("Tool execution error: Invalid arguments for 'echo'"));

        assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
        assert!(registry.collect_sources().is_empty());
    }

    #[tokio::test]
    async fn test_register_last_write_wins() {
        let first = EchoTool::new("echo");
        let second = EchoTool::new("echo");
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool::new("other"));
        registry.register(first.clone());
        registry.register(second.clone());

        assert_eq!(registry.len(), 2);
        let names: Vec<String> = registry
            .list_definitions()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["other", "echo"]);

        registry.execute("echo", &json!({"query": "x"})).await;
        assert_eq!(first.calls.load(Ordering::SeqCst), 0);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sources_follow_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool::new("alpha"));
        registry.register(EchoTool::new("beta"));

        registry.execute("beta", &json!({"query": "1"})).await;
        registry.execute("alpha", &json!({"query": "2"})).await;

        let labels: Vec<String> = registry
            .collect_sources()
            .into_iter()
            .map(|s| s.label)
            .collect();
        assert_eq!(labels, vec!["alpha - 2", "beta - 1"]);
    }

    #[tokio::test]
    async fn test_collect_is_idempotent_and_clear_empties() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool::new("echo"));
        registry.execute("echo", &json!({"query": "a"})).await;

        let first = registry.collect_sources();
        let second = registry.collect_sources();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);

        registry.clear_sources();
        assert!(registry.collect_sources().is_empty());
    }

    #[tokio::test]
    async fn test_fork_shares_tools_not_sources() {
        let tool = EchoTool::new("echo");
        let mut template = ToolRegistry::new();
        template.register(tool.clone());
        template.execute("echo", &json!({"query": "a"})).await;

        let mut forked = template.fork();
        assert!(forked.collect_sources().is_empty());
        assert_eq!(forked.list_definitions(), template.list_definitions());

        forked.execute("echo", &json!({"query": "b"})).await;
        assert_eq!(tool.calls.load(Ordering::SeqCst), 2);
        assert_eq!(template.collect_sources().len(), 1);
        assert_eq!(forked.collect_sources()[0].label, "echo - b");
    }
}
