//! In-memory course index.
//!
//! Holds the catalogue and content in process memory and ranks content by
//! cosine similarity of embeddings. Suitable for small course corpora.

use super::{
    cosine_similarity, ChunkMetadata, Course, CourseChunk, CourseIndex, CourseOutline,
    LessonSummary, SearchResults,
};
use crate::embedding::Embedder;
use crate::error::{CoursewiseError, Result};
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

struct CatalogEntry {
    course: Course,
    title_embedding: Vec<f32>,
}

struct StoredChunk {
    chunk: CourseChunk,
    embedding: Vec<f32>,
}

/// In-memory course index.
pub struct MemoryCourseIndex {
    embedder: Arc<dyn Embedder>,
    max_results: usize,
    resolve_min_score: f32,
    catalog: RwLock<Vec<CatalogEntry>>,
    chunks: RwLock<Vec<StoredChunk>>,
}

impl MemoryCourseIndex {
    /// Create an empty index backed by the given embedder.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            max_results: 5,
            resolve_min_score: 0.5,
            catalog: RwLock::new(Vec::new()),
            chunks: RwLock::new(Vec::new()),
        }
    }

    /// Set the maximum number of search results.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Set the minimum title similarity accepted by fuzzy resolution.
    pub fn with_resolve_min_score(mut self, min_score: f32) -> Self {
        self.resolve_min_score = min_score;
        self
    }

    // A poisoned lock only means another thread panicked mid-write of plain
    // data; the vectors are still structurally valid.
    fn catalog(&self) -> RwLockReadGuard<'_, Vec<CatalogEntry>> {
        self.catalog.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn catalog_mut(&self) -> RwLockWriteGuard<'_, Vec<CatalogEntry>> {
        self.catalog.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn stored_chunks(&self) -> RwLockReadGuard<'_, Vec<StoredChunk>> {
        self.chunks.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn stored_chunks_mut(&self) -> RwLockWriteGuard<'_, Vec<StoredChunk>> {
        self.chunks.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exact, case-insensitive or substring match against catalogue titles.
    fn match_title_text(&self, name: &str) -> Option<String> {
        let catalog = self.catalog();
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        if let Some(entry) = catalog.iter().find(|e| e.course.title == name) {
            return Some(entry.course.title.clone());
        }

        if let Some(entry) = catalog
            .iter()
            .find(|e| e.course.title.to_lowercase() == needle)
        {
            return Some(entry.course.title.clone());
        }

        // Whole-word containment outranks a match inside a word. A tie at
        // the best rank is left to the embedding resolver.
        let needle_words = words(&needle);
        let mut best: Option<(u8, &str)> = None;
        let mut tied = false;
        for entry in catalog.iter() {
            let title = entry.course.title.to_lowercase();
            if !title.contains(&needle) && !needle.contains(&title) {
                continue;
            }
            let title_words = words(&title);
            let rank = if contains_words(&title_words, &needle_words)
                || contains_words(&needle_words, &title_words)
            {
                2
            } else {
                1
            };
            match best {
                Some((top, _)) if rank < top => {}
                Some((top, _)) if rank == top => tied = true,
                _ => {
                    best = Some((rank, entry.course.title.as_str()));
                    tied = false;
                }
            }
        }

        if tied {
            debug!("Course name '{}' matches several titles", name);
            return None;
        }
        best.map(|(_, title)| title.to_string())
    }

    fn course(&self, title: &str) -> Option<Course> {
        self.catalog()
            .iter()
            .find(|e| e.course.title == title)
            .map(|e| e.course.clone())
    }
}

fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Whether `needle` appears as a contiguous run of whole words in `haystack`.
fn contains_words(haystack: &[&str], needle: &[&str]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

#[async_trait]
impl CourseIndex for MemoryCourseIndex {
    async fn add_course(&self, course: &Course) -> Result<()> {
        let title_embedding = self.embedder.embed(&course.title).await?;

        let mut catalog = self.catalog_mut();
        catalog.retain(|e| e.course.title != course.title);
        catalog.push(CatalogEntry {
            course: course.clone(),
            title_embedding,
        });

        debug!("Indexed course '{}' ({} lessons)", course.title, course.lessons.len());
        Ok(())
    }

    async fn add_chunks(&self, chunks: &[CourseChunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(CoursewiseError::Index(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let mut stored = self.stored_chunks_mut();
        stored.extend(
            chunks
                .iter()
                .cloned()
                .zip(embeddings)
                .map(|(chunk, embedding)| StoredChunk { chunk, embedding }),
        );

        Ok(chunks.len())
    }

    async fn clear(&self) -> Result<()> {
        self.catalog_mut().clear();
        self.stored_chunks_mut().clear();
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        course_filter: Option<&str>,
        lesson_filter: Option<u32>,
    ) -> SearchResults {
        let query_embedding = match self.embedder.embed(query).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Search embedding failed: {}", e);
                return SearchResults::from_error(format!("Search error: {}", e));
            }
        };

        let stored = self.stored_chunks();

        let mut scored: Vec<(f32, &CourseChunk)> = stored
            .iter()
            .filter(|s| course_filter.map_or(true, |title| s.chunk.course_title == title))
            .filter(|s| lesson_filter.map_or(true, |n| s.chunk.lesson_number == Some(n)))
            .map(|s| (cosine_similarity(&query_embedding, &s.embedding), &s.chunk))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.max_results);

        let mut results = SearchResults::default();
        for (score, chunk) in scored {
            results.documents.push(chunk.content.clone());
            results.metadata.push(ChunkMetadata::from(chunk));
            results.distances.push(1.0 - score);
        }
        results
    }

    async fn resolve_course_name(&self, name: &str) -> Option<String> {
        if let Some(title) = self.match_title_text(name) {
            return Some(title);
        }

        if self.catalog().is_empty() || name.trim().is_empty() {
            return None;
        }

        let name_embedding = match self.embedder.embed(name).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Course name resolution failed: {}", e);
                return None;
            }
        };

        let catalog = self.catalog();
        let best = catalog
            .iter()
            .map(|e| (cosine_similarity(&name_embedding, &e.title_embedding), e))
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))?;

        debug!(
            "Closest course to '{}' is '{}' (score {:.2})",
            name, best.1.course.title, best.0
        );

        (best.0 >= self.resolve_min_score).then(|| best.1.course.title.clone())
    }

    async fn get_course_link(&self, title: &str) -> Option<String> {
        self.course(title).and_then(|c| c.link)
    }

    async fn get_lesson_link(&self, title: &str, lesson_number: u32) -> Option<String> {
        self.course(title)?
            .lessons
            .into_iter()
            .find(|l| l.number == lesson_number)
            .and_then(|l| l.link)
    }

    async fn get_course_outline(&self, title: &str) -> Option<CourseOutline> {
        let course = self.course(title)?;

        let mut lessons: Vec<LessonSummary> = course
            .lessons
            .into_iter()
            .map(|l| LessonSummary {
                number: l.number,
                title: l.title,
            })
            .collect();
        lessons.sort_by_key(|l| l.number);

        Some(CourseOutline {
            title: course.title,
            link: course.link,
            lessons,
        })
    }

    async fn course_titles(&self) -> Vec<String> {
        self.catalog().iter().map(|e| e.course.title.clone()).collect()
    }
}
