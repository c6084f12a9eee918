//! HTTP API server for the course assistant.
//!
//! Provides REST endpoints for queries and the course catalogue.

use super::open_assistant;
use crate::assistant::{CourseAnalytics, CourseAssistant, QueryResponse};
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Shared application state.
struct AppState {
    assistant: CourseAssistant,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let assistant = open_assistant(&settings, Operation::Ask).await?;
    let app = router(Arc::new(AppState { assistant }));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Coursewise API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Query", "POST /api/query");
    Output::kv("Courses", "GET  /api/courses");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/query", post(query))
        .route("/api/courses", get(courses))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> impl IntoResponse {
    if req.query.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "query must not be empty".to_string(),
            }),
        )
            .into_response();
    }

    info!("API query: {}", req.query);
    let response: QueryResponse = state
        .assistant
        .query(&req.query, req.session_id.as_deref())
        .await;
    Json(response).into_response()
}

async fn courses(State(state): State<Arc<AppState>>) -> Json<CourseAnalytics> {
    Json(state.assistant.course_analytics().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Prompts;
    use crate::engine::{GenerationConfig, LanguageModel, ModelRequest, ModelResponse};
    use crate::error::Result;
    use crate::testing::populated_index;
    use async_trait::async_trait;

    struct EchoModel;

    #[async_trait]
    impl LanguageModel for EchoModel {
        async fn complete(&self, _request: &ModelRequest<'_>) -> Result<ModelResponse> {
            Ok(ModelResponse::text("An answer"))
        }
    }

    async fn state() -> Arc<AppState> {
        Arc::new(AppState {
            assistant: CourseAssistant::with_components(
                populated_index().await,
                Arc::new(EchoModel),
                GenerationConfig::default(),
                Prompts::default(),
                2,
            ),
        })
    }

    #[tokio::test]
    async fn test_query_handler_starts_and_continues_sessions() {
        let state = state().await;

        let first = query(
            State(state.clone()),
            Json(QueryRequest {
                query: "What is covered?".to_string(),
                session_id: None,
            }),
        )
        .await
        .into_response();
        assert_eq!(first.status(), StatusCode::OK);

        state
            .assistant
            .query("Follow-up", Some("session_1"))
            .await;
        let history = state.assistant.sessions().history("session_1").unwrap();
        assert!(history.starts_with("User: What is covered?\nAssistant: An answer"));
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let response = query(
            State(state().await),
            Json(QueryRequest {
                query: "  ".to_string(),
                session_id: None,
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_courses_handler() {
        let Json(analytics) = courses(State(state().await)).await;
        assert_eq!(analytics.total_courses, 1);
        assert_eq!(analytics.course_titles, vec!["Test Course"]);
    }

    #[test]
    fn test_router_builds() {
        let state = tokio_test::block_on(state());
        let _ = router(state);
    }
}
