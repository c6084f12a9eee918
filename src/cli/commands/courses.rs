//! Course catalogue commands.

use super::open_assistant;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// List loaded courses.
pub async fn run_courses(settings: Settings) -> Result<()> {
    let assistant = open_assistant(&settings, Operation::Load).await?;
    let analytics = assistant.course_analytics().await;

    if analytics.total_courses == 0 {
        Output::info("No courses loaded yet.");
        Output::info(&format!(
            "Add course documents to {} to get started.",
            settings.docs_dir().display()
        ));
        return Ok(());
    }

    Output::header(&format!("Courses ({})", analytics.total_courses));
    for title in &analytics.course_titles {
        Output::list_item(title);
    }

    Ok(())
}

/// Show one course's outline.
pub async fn run_outline(course: &str, settings: Settings) -> Result<()> {
    let assistant = open_assistant(&settings, Operation::Load).await?;

    println!("\n{}\n", assistant.course_outline(course).await);

    Ok(())
}
