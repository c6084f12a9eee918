//! Semantic search over course content.

use super::{course_not_found, parse_arguments, Source, Tool, ToolDefinition, ToolOutput};
use crate::error::ToolError;
use crate::index::{CourseIndex, SearchResults};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

const NAME: &str = "search_course_content";

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    course_name: Option<String>,
    #[serde(default)]
    lesson_number: Option<u32>,
}

/// Searches course content, optionally narrowed to a course and lesson.
pub struct CourseSearchTool {
    index: Arc<dyn CourseIndex>,
}

impl CourseSearchTool {
    pub fn new(index: Arc<dyn CourseIndex>) -> Self {
        Self { index }
    }

    /// Render results as labeled blocks and collect one source per hit.
    async fn format_results(&self, results: &SearchResults) -> ToolOutput {
        let mut blocks = Vec::with_capacity(results.len());
        let mut sources = Vec::with_capacity(results.len());

        for (document, meta) in results.hits() {
            let label = match meta.lesson_number {
                Some(n) => format!("{} - Lesson {}", meta.course_title, n),
                None => meta.course_title.clone(),
            };

            let link = match meta.lesson_number {
                Some(n) => self.index.get_lesson_link(&meta.course_title, n).await,
                None => None,
            };

            blocks.push(format!("[{}]\n{}", label, document));
            sources.push(Source::new(label, link));
        }

        ToolOutput::with_sources(blocks.join("\n\n"), sources)
    }
}

#[async_trait]
impl Tool for CourseSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            NAME,
            "Search course materials with smart course name matching and lesson filtering",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in the course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                    }
                },
                "required": ["query"]
            }),
        )
    }

    async fn execute(&self, arguments: &Value) -> Result<ToolOutput, ToolError> {
        let args: SearchArgs = parse_arguments(NAME, arguments)?;

        let course_title = match &args.course_name {
            Some(name) => match self.index.resolve_course_name(name).await {
                Some(title) => Some(title),
                None => return Ok(ToolOutput::text(course_not_found(name))),
            },
            None => None,
        };

        let results = self
            .index
            .search(&args.query, course_title.as_deref(), args.lesson_number)
            .await;

        if let Some(error) = results.error {
            return Ok(ToolOutput::text(error));
        }

        if results.is_empty() {
            let mut filters = String::new();
            if let Some(name) = &args.course_name {
                filters.push_str(&format!(" in course '{}'", name));
            }
            if let Some(n) = args.lesson_number {
                filters.push_str(&format!(" in lesson {}", n));
            }
            return Ok(ToolOutput::text(format!("No relevant content found{}.", filters)));
        }

        if !results.is_consistent() {
            return Ok(ToolOutput::text(format!(
                "Search error: {} results but {} metadata entries",
                results.documents.len(),
                results.metadata.len()
            )));
        }

        debug!("Search for '{}' returned {} chunks", args.query, results.len());
        Ok(self.format_results(&results).await)
    }
}
