//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway.

use crate::error::{CoursewiseError, Result};
use std::path::Path;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Loading course documents requires an API key for embeddings.
    Load,
    /// Asking questions requires an API key for the chat model.
    Ask,
    /// Configuration commands have no requirements.
    Config,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Load | Operation::Ask => {
            check_api_key()?;
        }
        Operation::Config => {
            // No external requirements
        }
    }
    Ok(())
}

/// Check that the course documents directory exists.
pub fn check_docs_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(CoursewiseError::Config(format!(
            "Course documents directory not found: {}. Set general.docs_dir or pass --docs.",
            dir.display()
        )))
    }
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(CoursewiseError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(CoursewiseError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}
