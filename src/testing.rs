//! Shared fixtures for unit tests.

use crate::embedding::Embedder;
use crate::error::Result;
use crate::index::{Course, CourseChunk, CourseIndex, Lesson, MemoryCourseIndex};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Deterministic bag-of-words embedder: each lowercase word bumps one bucket.
pub struct KeywordEmbedder {
    dimensions: usize,
}

impl Default for KeywordEmbedder {
    fn default() -> Self {
        Self { dimensions: 256 }
    }
}

impl KeywordEmbedder {
    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() % self.dimensions as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

pub fn sample_course() -> Course {
    Course {
        title: "Test Course".to_string(),
        link: Some("https://example.com/course".to_string()),
        instructor: Some("Test Instructor".to_string()),
        lessons: vec![
            Lesson {
                number: 2,
                title: "Advanced Topics".to_string(),
                link: Some("https://example.com/lesson2".to_string()),
            },
            Lesson {
                number: 1,
                title: "Introduction".to_string(),
                link: Some("https://example.com/lesson1".to_string()),
            },
        ],
    }
}

pub fn sample_chunks() -> Vec<CourseChunk> {
    vec![
        CourseChunk {
            course_title: "Test Course".to_string(),
            lesson_number: Some(1),
            chunk_index: 0,
            content: "Course Test Course Lesson 1 content: This is the introduction to the test course."
                .to_string(),
        },
        CourseChunk {
            course_title: "Test Course".to_string(),
            lesson_number: Some(1),
            chunk_index: 1,
            content: "Course Test Course Lesson 1 content: We'll cover basic concepts and terminology."
                .to_string(),
        },
        CourseChunk {
            course_title: "Test Course".to_string(),
            lesson_number: Some(2),
            chunk_index: 2,
            content: "Course Test Course Lesson 2 content: Advanced topics include complex algorithms."
                .to_string(),
        },
    ]
}

/// Memory index holding [`sample_course`] and [`sample_chunks`].
pub async fn populated_index() -> Arc<MemoryCourseIndex> {
    let index = MemoryCourseIndex::new(Arc::new(KeywordEmbedder::default()))
        .with_max_results(5)
        .with_resolve_min_score(0.7);
    index.add_course(&sample_course()).await.unwrap();
    index.add_chunks(&sample_chunks()).await.unwrap();
    Arc::new(index)
}
