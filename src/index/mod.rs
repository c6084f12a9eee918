//! Course index abstraction for Coursewise.
//!
//! The index stores the course catalogue (titles, links, lessons) and the
//! chunked course content, and answers semantic searches over that content.
//! Tools only see the [`CourseIndex`] trait.

mod memory;

pub use memory::MemoryCourseIndex;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A lesson within a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    /// Lesson number, unique within its course.
    pub number: u32,
    /// Lesson title.
    pub title: String,
    /// Link to the lesson, if published.
    #[serde(default)]
    pub link: Option<String>,
}

/// Course catalogue record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// Canonical course title, used as the course identifier.
    pub title: String,
    /// Link to the course page.
    #[serde(default)]
    pub link: Option<String>,
    /// Course instructor.
    #[serde(default)]
    pub instructor: Option<String>,
    /// Lessons in the course.
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

/// A chunk of course content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseChunk {
    /// Title of the course this chunk belongs to.
    pub course_title: String,
    /// Lesson the chunk was taken from, if any.
    #[serde(default)]
    pub lesson_number: Option<u32>,
    /// Position of the chunk within the course.
    pub chunk_index: usize,
    /// Text content.
    pub content: String,
}

/// Metadata attached to one search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub chunk_index: usize,
}

impl From<&CourseChunk> for ChunkMetadata {
    fn from(chunk: &CourseChunk) -> Self {
        Self {
            course_title: chunk.course_title.clone(),
            lesson_number: chunk.lesson_number,
            chunk_index: chunk.chunk_index,
        }
    }
}

/// Results of a content search.
///
/// `documents`, `metadata` and `distances` are parallel vectors. A failed
/// search carries the failure text in `error` and no documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub documents: Vec<String>,
    pub metadata: Vec<ChunkMetadata>,
    pub distances: Vec<f32>,
    pub error: Option<String>,
}

impl SearchResults {
    /// Results representing a failed search.
    pub fn from_error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Whether the search produced no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Number of documents returned.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether every document has its metadata entry.
    pub fn is_consistent(&self) -> bool {
        self.documents.len() == self.metadata.len()
    }

    /// Iterate over `(document, metadata)` pairs in rank order.
    ///
    /// Stops at the shorter of the two lists; check [`is_consistent`](Self::is_consistent) first.
    pub fn hits(&self) -> impl Iterator<Item = (&str, &ChunkMetadata)> {
        self.documents
            .iter()
            .map(String::as_str)
            .zip(self.metadata.iter())
    }
}

/// Lesson entry in a course outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonSummary {
    pub number: u32,
    pub title: String,
}

/// Course title, link and ordered lesson list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseOutline {
    pub title: String,
    pub link: Option<String>,
    /// Lessons in ascending lesson-number order.
    pub lessons: Vec<LessonSummary>,
}

/// Trait for course index implementations.
#[async_trait]
pub trait CourseIndex: Send + Sync {
    /// Add or replace a course in the catalogue.
    async fn add_course(&self, course: &Course) -> Result<()>;

    /// Add content chunks. Returns the number stored.
    async fn add_chunks(&self, chunks: &[CourseChunk]) -> Result<usize>;

    /// Remove all courses and content.
    async fn clear(&self) -> Result<()>;

    /// Semantic search over content, optionally restricted to one course
    /// title and/or one lesson number.
    async fn search(
        &self,
        query: &str,
        course_filter: Option<&str>,
        lesson_filter: Option<u32>,
    ) -> SearchResults;

    /// Map a possibly partial course name to a canonical title.
    async fn resolve_course_name(&self, name: &str) -> Option<String>;

    /// Link to a course page.
    async fn get_course_link(&self, title: &str) -> Option<String>;

    /// Link to a specific lesson.
    async fn get_lesson_link(&self, title: &str, lesson_number: u32) -> Option<String>;

    /// Title, link and ordered lessons of a course.
    async fn get_course_outline(&self, title: &str) -> Option<CourseOutline>;

    /// All catalogue titles.
    async fn course_titles(&self) -> Vec<String>;

    /// Number of courses in the catalogue.
    async fn course_count(&self) -> usize {
        self.course_titles().await.len()
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
