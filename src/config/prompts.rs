//! Prompt templates for Coursewise.
//!
//! Prompts can be customized by placing an `assistant.toml` file in the
//! custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub assistant: AssistantPrompts,
}

/// Prompts driving the tool-calling assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantPrompts {
    /// Behavioural policy sent as the system instructions on every call.
    pub system: String,
    /// User turn appended when the tool-round budget runs out.
    pub finalize: String,
    /// Wrapper applied to the raw user question, `{{query}}` is substituted.
    pub query: String,
}

impl Default for AssistantPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an assistant for course materials and educational content, with tools for searching course content and looking up course outlines.

Tool usage:
- Content search tool: questions about specific course content or detailed material
- Course outline tool: questions about course structure, lesson lists or course overviews
- You may call tools across several rounds; use earlier results to refine later calls (for example, fetch an outline first, then search a specific lesson)
- Abbreviated course names ("MCP", "RAG course"): always look up the course outline first to find the full title, then search with that title
- If tools return nothing relevant, say so plainly without suggesting alternatives

Answering:
- General knowledge questions: answer directly without tools
- Course-specific questions: use tools first, then answer
- Outline questions: give the course title, course link and the numbered lesson list
- Never describe your reasoning or tool usage; do not say "based on the search results"

Every answer must be brief, educational and clear, with an example when it helps understanding.
Give only the direct answer to what was asked."#
                .to_string(),

            finalize: "Please provide a comprehensive answer based on the search results you found above."
                .to_string(),

            query: "Answer this question about course materials: {{query}}".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, applying overrides from an optional custom directory.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let assistant_path = custom_path.join("assistant.toml");
            if assistant_path.exists() {
                let content = std::fs::read_to_string(&assistant_path)?;
                prompts.assistant = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Wrap a raw user question in the query template.
    pub fn render_query(&self, query: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), query.to_string());
        Self::render(&self.assistant.query, &vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(!prompts.assistant.system.is_empty());
        assert!(prompts.assistant.finalize.contains("comprehensive answer"));
    }

    #[test]
    fn test_render_query() {
        let prompts = Prompts::default();
        assert_eq!(
            prompts.render_query("What is AI?"),
            "Answer this question about course materials: What is AI?"
        );
    }

    #[test]
    fn test_custom_dir_overrides_assistant_prompts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("assistant.toml"),
            "system = \"Be terse.\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str()).unwrap();
        assert_eq!(prompts.assistant.system, "Be terse.");
        // Unspecified keys fall back to defaults.
        assert!(prompts.assistant.query.contains("{{query}}"));
    }
}
