//! Error types for Coursewise.

use thiserror::Error;

/// Library-level error type for Coursewise operations.
#[derive(Error, Debug)]
pub enum CoursewiseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Model call timed out after {0} seconds")]
    Timeout(u64),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Faults raised at the tool execution boundary.
///
/// These never reach the caller of the generation engine: they are fed back
/// to the model as error results so it can adjust its next request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Tool '{0}' not found")]
    NotFound(String),

    #[error("Invalid arguments for '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("{0}")]
    Failed(String),
}

/// Result type alias for Coursewise operations.
pub type Result<T> = std::result::Result<T, CoursewiseError>;
