//! The course assistant.
//!
//! Wires the course index, the course tools, conversation sessions and the
//! generation engine together.

use crate::config::{Prompts, Settings};
use crate::documents::{load_course_folder, LoadSummary};
use crate::embedding::OpenAIEmbedder;
use crate::engine::{
    GenerationConfig, GenerationEngine, GenerationOutcome, LanguageModel, OpenAIModel,
};
use crate::error::Result;
use crate::index::{CourseIndex, MemoryCourseIndex};
use crate::session::SessionStore;
use crate::tools::{CourseOutlineTool, CourseSearchTool, Source, ToolRegistry};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

/// Answer to one user query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    /// Sources from the last tool round, empty when no tools ran.
    pub sources: Vec<Source>,
    pub session_id: String,
}

/// Catalogue statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

/// Retrieval-augmented assistant over the course catalogue.
pub struct CourseAssistant {
    index: Arc<dyn CourseIndex>,
    tools: ToolRegistry,
    sessions: SessionStore,
    engine: GenerationEngine,
    prompts: Prompts,
    max_concurrent_embeddings: usize,
}

impl CourseAssistant {
    /// Build an assistant backed by OpenAI and an in-memory index.
    pub fn new(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;

        let embedder = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding)?);
        let index = Arc::new(
            MemoryCourseIndex::new(embedder)
                .with_max_results(settings.index.max_results)
                .with_resolve_min_score(settings.index.resolve_min_score),
        );

        let config = GenerationConfig::from(&settings.generation);
        let model = Arc::new(OpenAIModel::new(&config)?);

        let mut assistant = Self::with_components(
            index,
            model,
            config,
            prompts,
            settings.session.max_history,
        );
        assistant.max_concurrent_embeddings = settings.index.max_concurrent_embeddings;
        Ok(assistant)
    }

    /// Build an assistant from existing components.
    pub fn with_components(
        index: Arc<dyn CourseIndex>,
        model: Arc<dyn LanguageModel>,
        config: GenerationConfig,
        prompts: Prompts,
        max_history: usize,
    ) -> Self {
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(CourseSearchTool::new(index.clone())));
        tools.register(Arc::new(CourseOutlineTool::new(index.clone())));

        let engine = GenerationEngine::new(model, config).with_prompts(prompts.assistant.clone());

        Self {
            index,
            tools,
            sessions: SessionStore::new(max_history),
            engine,
            prompts,
            max_concurrent_embeddings: 4,
        }
    }

    /// The underlying course index.
    pub fn index(&self) -> Arc<dyn CourseIndex> {
        self.index.clone()
    }

    /// The session store.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Answer a question, continuing `session_id` or starting a new session.
    pub async fn query(&self, query: &str, session_id: Option<&str>) -> QueryResponse {
        self.query_with_trace(query, session_id).await.0
    }

    /// Like [`query`](Self::query), also returning how the answer was produced.
    #[instrument(skip(self))]
    pub async fn query_with_trace(
        &self,
        query: &str,
        session_id: Option<&str>,
    ) -> (QueryResponse, GenerationOutcome) {
        let session_id = match session_id {
            Some(id) => id.to_string(),
            None => self.sessions.create_session(),
        };

        let history = self.sessions.history(&session_id);
        let prompt = self.prompts.render_query(query);

        // Per-query source buffers, so concurrent queries never see each other's sources.
        let mut tools = self.tools.fork();
        let outcome = self
            .engine
            .generate_with_trace(&prompt, history.as_deref(), Some(&mut tools))
            .await;
        let sources = tools.collect_sources();

        self.sessions.add_exchange(&session_id, query, &outcome.answer);

        let response = QueryResponse {
            answer: outcome.answer.clone(),
            sources,
            session_id,
        };
        (response, outcome)
    }

    /// Load every course document in `path`, optionally clearing the index first.
    pub async fn add_course_folder(&self, path: &Path, clear_existing: bool) -> Result<LoadSummary> {
        if clear_existing {
            info!("Clearing existing course data");
            self.index.clear().await?;
        }

        load_course_folder(self.index.as_ref(), path, self.max_concurrent_embeddings).await
    }

    /// Number of courses and their titles.
    pub async fn course_analytics(&self) -> CourseAnalytics {
        let course_titles = self.index.course_titles().await;
        CourseAnalytics {
            total_courses: course_titles.len(),
            course_titles,
        }
    }

    /// Course outline text, resolved the same way the model's outline tool does.
    pub async fn course_outline(&self, course_name: &str) -> String {
        self.tools
            .fork()
            .execute("get_course_outline", &json!({ "course_name": course_name }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ModelRequest, ModelResponse, ToolInvocation, Turn};
    use crate::error::CoursewiseError;
    use crate::testing::{populated_index, KeywordEmbedder};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Replays replies and records the system text and first user turn.
    #[derive(Default)]
    struct StubModel {
        replies: Mutex<VecDeque<ModelResponse>>,
        systems: Mutex<Vec<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl StubModel {
        fn replying(replies: Vec<ModelResponse>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                ..Default::default()
            })
        }
    }

    #[async_trait]
    impl LanguageModel for StubModel {
        async fn complete(&self, request: &ModelRequest<'_>) -> Result<ModelResponse> {
            self.systems.lock().unwrap().push(request.system.to_string());
            if let Some(Turn::User(text)) = request.turns.first() {
                self.prompts.lock().unwrap().push(text.clone());
            }
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| CoursewiseError::OpenAI("no reply scripted".to_string()))
        }
    }

    async fn assistant(model: Arc<StubModel>) -> CourseAssistant {
        CourseAssistant::with_components(
            populated_index().await,
            model,
            GenerationConfig::default(),
            Prompts::default(),
            2,
        )
    }

    #[tokio::test]
    async fn test_query_wraps_prompt_and_creates_session() {
        let model = StubModel::replying(vec![ModelResponse::text("Hi")]);
        let assistant = assistant(model.clone()).await;

        let response = assistant.query("What is RAG?", None).await;

        assert_eq!(response.answer, "Hi");
        assert_eq!(response.session_id, "session_1");
        assert!(response.sources.is_empty());
        assert_eq!(
            model.prompts.lock().unwrap()[0],
            "Answer this question about course materials: What is RAG?"
        );
    }

    #[tokio::test]
    async fn test_session_history_reaches_the_model() {
        let model = StubModel::replying(vec![
            ModelResponse::text("First answer"),
            ModelResponse::text("Second answer"),
        ]);
        let assistant = assistant(model.clone()).await;

        let first = assistant.query("First question", None).await;
        assistant.query("Second question", Some(&first.session_id)).await;

        let systems = model.systems.lock().unwrap();
        assert!(!systems[0].contains("Previous conversation"));
        assert!(systems[1].ends_with("User: First question\nAssistant: First answer"));
    }

    #[tokio::test]
    async fn test_query_returns_sources_from_tools() {
        let model = StubModel::replying(vec![
            ModelResponse::tool_calls(vec![ToolInvocation {
                id: "call_1".to_string(),
                name: "search_course_content".to_string(),
                arguments: json!({"query": "algorithms", "lesson_number": 2}),
            }]),
            ModelResponse::text("Lesson 2 covers algorithms."),
        ]);
        let assistant = assistant(model).await;

        let (response, outcome) = assistant
            .query_with_trace("What is in lesson 2?", None)
            .await;

        assert_eq!(response.answer, "Lesson 2 covers algorithms.");
        assert_eq!(outcome.tool_rounds, 1);
        assert_eq!(outcome.tool_calls[0].name, "search_course_content");
        assert_eq!(
            response.sources,
            vec![Source::new(
                "Test Course - Lesson 2",
                Some("https://example.com/lesson2".to_string())
            )]
        );
    }

    #[tokio::test]
    async fn test_analytics_and_outline() {
        let assistant = assistant(StubModel::replying(Vec::new())).await;

        let analytics = assistant.course_analytics().await;
        assert_eq!(analytics.total_courses, 1);
        assert_eq!(analytics.course_titles, vec!["Test Course"]);

        let outline = assistant.course_outline("test course").await;
        assert!(outline.starts_with("**Course:** Test Course"));
    }

    #[tokio::test]
    async fn test_add_course_folder_with_clear() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("course.json"),
            json!({
                "course": {"title": "Other Course"},
                "chunks": [{"lesson_number": 0, "content": "Welcome"}]
            })
            .to_string(),
        )
        .unwrap();

        let assistant = CourseAssistant::with_components(
            populated_index().await,
            StubModel::replying(Vec::new()),
            GenerationConfig::default(),
            Prompts::default(),
            2,
        );

        let summary = assistant.add_course_folder(dir.path(), true).await.unwrap();
        assert_eq!(summary, LoadSummary { courses: 1, chunks: 1 });
        assert_eq!(
            assistant.course_analytics().await.course_titles,
            vec!["Other Course"]
        );

        let fresh = CourseAssistant::with_components(
            Arc::new(MemoryCourseIndex::new(Arc::new(KeywordEmbedder::default()))),
            StubModel::replying(Vec::new()),
            GenerationConfig::default(),
            Prompts::default(),
            2,
        );
        let summary = fresh.add_course_folder(dir.path(), false).await.unwrap();
        assert_eq!(summary.courses, 1);
    }
}
