//! Tools the language model can invoke while answering a question.
//!
//! A [`Tool`] describes itself with a [`ToolDefinition`] (name, description
//! and JSON schema of its arguments) and executes against structured
//! arguments, returning display text plus the [`Source`]s it drew from.
//! The [`ToolRegistry`] holds the tools available to one query.

mod outline;
mod registry;
mod search;

pub use outline::CourseOutlineTool;
pub use registry::ToolRegistry;
pub use search::CourseSearchTool;

use crate::error::ToolError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Model-facing description of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique, stable tool name.
    pub name: String,
    /// What the tool does, written for the model.
    pub description: String,
    /// JSON schema of the arguments: `{type: object, properties, required}`.
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Names of the required arguments.
    pub fn required(&self) -> Vec<&str> {
        self.input_schema["required"]
            .as_array()
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Where a piece of retrieved content came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Display label, e.g. "Course X - Lesson 3".
    pub label: String,
    /// Link to the lesson, when the index has one.
    pub link: Option<String>,
}

impl Source {
    pub fn new(label: impl Into<String>, link: Option<String>) -> Self {
        Self {
            label: label.into(),
            link,
        }
    }
}

/// Encodes as `label` or `label|link`.
impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.link {
            Some(link) => write!(f, "{}|{}", self.label, link),
            None => write!(f, "{}", self.label),
        }
    }
}

/// Result of one tool execution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolOutput {
    /// Text handed back to the model.
    pub content: String,
    /// Sources touched by this execution.
    pub sources: Vec<Source>,
}

impl ToolOutput {
    /// Output with text only.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sources: Vec::new(),
        }
    }

    /// Output with text and the sources it cites.
    pub fn with_sources(content: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            content: content.into(),
            sources,
        }
    }
}

/// A named capability the model can invoke.
///
/// Expected conditions (unknown course, no matches, index unavailable) are
/// reported as `Ok` text so the model can react to them. `Err` is reserved
/// for faults such as arguments that cannot be interpreted.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Describe the tool. Must be pure.
    fn definition(&self) -> ToolDefinition;

    /// Execute with the model-supplied arguments.
    async fn execute(&self, arguments: &Value) -> Result<ToolOutput, ToolError>;
}

/// Deserialize tool arguments into a typed struct.
pub(crate) fn parse_arguments<T: DeserializeOwned>(tool: &str, arguments: &Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments.clone()).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

/// Message returned when a course name cannot be resolved.
pub(crate) fn course_not_found(course_name: &str) -> String {
    format!("No course found matching '{}'.", course_name)
}
