//! Course outline lookup.

use super::{course_not_found, parse_arguments, Tool, ToolDefinition, ToolOutput};
use crate::error::ToolError;
use crate::index::{CourseIndex, CourseOutline};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const NAME: &str = "get_course_outline";

#[derive(Debug, Deserialize)]
struct OutlineArgs {
    course_name: String,
}

/// Returns a course's title, link and complete lesson list.
///
/// Outlines are catalogue data rather than retrieved content, so this tool
/// never records sources.
pub struct CourseOutlineTool {
    index: Arc<dyn CourseIndex>,
}

impl CourseOutlineTool {
    pub fn new(index: Arc<dyn CourseIndex>) -> Self {
        Self { index }
    }
}

fn format_outline(outline: &CourseOutline) -> String {
    let mut lines = vec![
        format!("**Course:** {}", outline.title),
        format!(
            "**Course Link:** {}",
            outline.link.as_deref().unwrap_or("Not available")
        ),
        "**Lessons:**".to_string(),
    ];

    let mut lessons: Vec<_> = outline.lessons.iter().collect();
    lessons.sort_by_key(|l| l.number);
    lines.extend(lessons.iter().map(|l| format!("{}. {}", l.number, l.title)));

    lines.join("\n")
}

#[async_trait]
impl Tool for CourseOutlineTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            NAME,
            "Get the complete outline of a course: title, course link and every lesson with its number and title",
            json!({
                "type": "object",
                "properties": {
                    "course_name": {
                        "type": "string",
                        "description": "Course title or abbreviation (partial matches work, e.g. 'MCP', 'RAG')"
                    }
                },
                "required": ["course_name"]
            }),
        )
    }

    async fn execute(&self, arguments: &Value) -> Result<ToolOutput, ToolError> {
        let args: OutlineArgs = parse_arguments(NAME, arguments)?;

        let Some(title) = self.index.resolve_course_name(&args.course_name).await else {
            return Ok(ToolOutput::text(course_not_found(&args.course_name)));
        };

        match self.index.get_course_outline(&title).await {
            Some(outline) => Ok(ToolOutput::text(format_outline(&outline))),
            None => Ok(ToolOutput::text(format!(
                "No outline available for course '{}'.",
                title
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::LessonSummary;
    use crate::testing::populated_index;

    #[test]
    fn test_definition() {
        let definition = CourseOutlineTool::new(Arc::new(crate::index::MemoryCourseIndex::new(
            Arc::new(crate::testing::KeywordEmbedder::default()),
        )))
        .definition();

        assert_eq!(definition.name, "get_course_outline");
        assert!(definition.input_schema["properties"]["course_name"].is_object());
        assert_eq!(definition.required(), vec!["course_name"]);
    }

    #[test]
    fn test_format_outline_sorts_lessons_and_defaults_link() {
        let outline = CourseOutline {
            title: "Course A".to_string(),
            link: None,
            lessons: vec![
                LessonSummary {
                    number: 3,
                    title: "Wrap-up".to_string(),
                },
                LessonSummary {
                    number: 1,
                    title: "Basics".to_string(),
                },
            ],
        };

        assert_eq!(
            format_outline(&outline),
            "**Course:** Course A\n**Course Link:** Not available\n**Lessons:**\n1. Basics\n3. Wrap-up"
        );
    }

    #[tokio::test]
    async fn test_execute_valid_course() {
        let tool = CourseOutlineTool::new(populated_index().await);

        let output = tool.execute(&json!({"course_name": "test"})).await.unwrap();

        assert_eq!(
            output.content,
            "**Course:** Test Course\n**Course Link:** https://example.com/course\n**Lessons:**\n1. Introduction\n2. Advanced Topics"
        );
        assert!(output.sources.is_empty());
    }

    #[tokio::test]
    async fn test_execute_invalid_course() {
        let tool = CourseOutlineTool::new(populated_index().await);

        let output = tool
            .execute(&json!({"course_name": "Nonexistent Course"}))
            .await
            .unwrap();
        assert_eq!(output.content, "No course found matching 'Nonexistent Course'.");
    }
}
