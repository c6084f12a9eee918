//! Coursewise - Ask questions about course materials
//!
//! A retrieval-augmented assistant over a small corpus of course documents.
//! A language model answers questions and may call tools to search course
//! content or look up course outlines, over a bounded number of rounds.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt templates
//! - `embedding` - Embedding generation
//! - `index` - Course catalogue and semantic content index
//! - `documents` - Loading course documents into the index
//! - `tools` - Tools the model can call, and the registry that runs them
//! - `engine` - The bounded tool-calling generation loop
//! - `session` - Conversation history
//! - `assistant` - Wires everything together
//!
//! # Example
//!
//! ```rust,no_run
//! use coursewise::assistant::CourseAssistant;
//! use coursewise::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let assistant = CourseAssistant::new(&settings)?;
//!     assistant.add_course_folder(&settings.docs_dir(), false).await?;
//!
//!     let response = assistant.query("What does lesson 1 cover?", None).await;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod assistant;
pub mod cli;
pub mod config;
pub mod documents;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod index;
pub mod openai;
pub mod session;
pub mod tools;

#[cfg(test)]
mod testing;

pub use error::{CoursewiseError, Result};
