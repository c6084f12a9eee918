//! Loading course documents into the index.
//!
//! A course document is a JSON file holding the course catalogue record and
//! its content, already split into chunks:
//!
//! ```json
//! {
//!   "course": { "title": "...", "link": "...", "instructor": "...", "lessons": [...] },
//!   "chunks": [ { "lesson_number": 1, "content": "..." } ]
//! }
//! ```

use crate::error::{CoursewiseError, Result};
use crate::index::{Course, CourseChunk, CourseIndex};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One chunk as stored in a course document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    #[serde(default)]
    pub lesson_number: Option<u32>,
    pub content: String,
}

/// A parsed course document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseDocument {
    pub course: Course,
    #[serde(default)]
    pub chunks: Vec<DocumentChunk>,
}

impl CourseDocument {
    /// Chunks tagged with the course title and numbered in document order.
    pub fn course_chunks(&self) -> Vec<CourseChunk> {
        self.chunks
            .iter()
            .enumerate()
            .map(|(chunk_index, chunk)| CourseChunk {
                course_title: self.course.title.clone(),
                lesson_number: chunk.lesson_number,
                chunk_index,
                content: chunk.content.clone(),
            })
            .collect()
    }
}

/// Counts from a folder load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub courses: usize,
    pub chunks: usize,
}

/// Read and parse a single course document.
pub async fn read_course_document(path: &Path) -> Result<CourseDocument> {
    let content = tokio::fs::read_to_string(path).await?;
    let document: CourseDocument = serde_json::from_str(&content)?;

    if document.course.title.trim().is_empty() {
        return Err(CoursewiseError::Document(format!(
            "{} has an empty course title",
            path.display()
        )));
    }

    Ok(document)
}

/// `*.json` files directly inside `dir`, sorted by path.
pub fn course_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(CoursewiseError::Document(format!(
            "Folder not found: {}",
            dir.display()
        )));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("json"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Load every course document in `dir` into `index`.
///
/// Files that cannot be read or parsed are logged and skipped. Courses whose
/// title is already indexed, or appears earlier in the same folder, are
/// skipped. Embedding runs for up to `max_concurrent` courses at once.
pub async fn load_course_folder(
    index: &dyn CourseIndex,
    dir: &Path,
    max_concurrent: usize,
) -> Result<LoadSummary> {
    let files = course_files(dir)?;
    info!("Found {} course documents in {}", files.len(), dir.display());

    let mut known: HashSet<String> = index.course_titles().await.into_iter().collect();
    let mut documents = Vec::with_capacity(files.len());

    for path in &files {
        match read_course_document(path).await {
            Ok(document) => {
                if known.insert(document.course.title.clone()) {
                    documents.push(document);
                } else {
                    info!("Course already indexed: {}", document.course.title);
                }
            }
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }

    let mut summary = LoadSummary::default();
    let mut stream = stream::iter(documents)
        .map(|document| async move {
            let chunks = document.course_chunks();
            let result = match index.add_course(&document.course).await {
                Ok(()) => index.add_chunks(&chunks).await,
                Err(e) => Err(e),
            };
            (document.course.title, result)
        })
        .buffer_unordered(max_concurrent.max(1));

    while let Some((title, result)) = stream.next().await {
        match result {
            Ok(chunks) => {
                debug!("Indexed '{}' ({} chunks)", title, chunks);
                summary.courses += 1;
                summary.chunks += chunks;
            }
            Err(e) => warn!("Failed to index '{}': {}", title, e),
        }
    }

    info!(
        "Loaded {} courses with {} chunks",
        summary.courses, summary.chunks
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryCourseIndex;
    use crate::testing::KeywordEmbedder;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn write_course(dir: &Path, file: &str, title: &str, chunks: usize) {
        let document = json!({
            "course": {
                "title": title,
                "link": "https://example.com",
                "lessons": [{"number": 1, "title": "Intro"}]
            },
            "chunks": (0..chunks)
                .map(|i| json!({"lesson_number": 1, "content": format!("{} chunk {}", title, i)}))
                .collect::<Vec<_>>()
        });
        std::fs::write(dir.join(file), document.to_string()).unwrap();
    }

    fn index() -> MemoryCourseIndex {
        MemoryCourseIndex::new(Arc::new(KeywordEmbedder::default()))
    }

    #[test]
    fn test_course_chunks_are_numbered_and_tagged() {
        let document: CourseDocument = serde_json::from_value(json!({
            "course": {"title": "Course A"},
            "chunks": [
                {"lesson_number": 1, "content": "a"},
                {"content": "b"}
            ]
        }))
        .unwrap();

        let chunks = document.course_chunks();
        assert_eq!(chunks[0].course_title, "Course A");
        assert_eq!(chunks[1].chunk_index, 1);
        assert_eq!(chunks[1].lesson_number, None);
    }

    #[test]
    fn test_course_files_only_json() {
        let dir = TempDir::new().unwrap();
        write_course(dir.path(), "b.json", "B", 1);
        write_course(dir.path(), "a.JSON", "A", 1);
        std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let files = course_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.JSON"));
    }

    #[test]
    fn test_missing_folder_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = course_files(&dir.path().join("missing"));
        assert!(matches!(result, Err(CoursewiseError::Document(_))));
    }

    #[tokio::test]
    async fn test_load_skips_bad_files_and_duplicates() {
        let dir = TempDir::new().unwrap();
        write_course(dir.path(), "1.json", "Course A", 3);
        write_course(dir.path(), "2.json", "Course B", 2);
        write_course(dir.path(), "3.json", "Course A", 5);
        std::fs::write(dir.path().join("4.json"), "{ not json").unwrap();

        let index = index();
        let summary = load_course_folder(&index, dir.path(), 2).await.unwrap();

        assert_eq!(summary, LoadSummary { courses: 2, chunks: 5 });
        assert_eq!(index.course_count().await, 2);

        let again = load_course_folder(&index, dir.path(), 2).await.unwrap();
        assert_eq!(again, LoadSummary::default());
    }
}
