//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod courses;
mod serve;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use courses::{run_courses, run_outline};
pub use serve::run_serve;

use crate::assistant::CourseAssistant;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Build the assistant and load the course documents into it.
///
/// `operation` selects the pre-flight checks to run first.
pub(crate) async fn open_assistant(settings: &Settings, operation: Operation) -> Result<CourseAssistant> {
    let docs_dir = settings.docs_dir();
    if let Err(e) = preflight::check(operation).and_then(|_| preflight::check_docs_dir(&docs_dir)) {
        Output::error(&format!("{}", e));
        Output::info("Run 'coursewise config init' to create a default configuration.");
        return Err(e.into());
    }

    let assistant = CourseAssistant::new(settings)?;

    let spinner = Output::spinner("Loading course documents...");
    let loaded = assistant.add_course_folder(&docs_dir, false).await;
    spinner.finish_and_clear();

    let summary = loaded?;
    if summary.courses == 0 {
        Output::warning(&format!("No course documents loaded from {}", docs_dir.display()));
    }

    Ok(assistant)
}
