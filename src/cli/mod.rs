//! CLI module for Coursewise.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Coursewise - Ask questions about your course materials
///
/// Loads course documents into a semantic index and answers questions with a
/// language model that searches the courses through tools.
#[derive(Parser, Debug)]
#[command(name = "coursewise")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Directory of course documents (overrides general.docs_dir)
    #[arg(short, long, global = true, env = "COURSEWISE_DOCS")]
    pub docs: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a single question about the course materials
    Ask {
        /// The question to ask
        question: String,

        /// Show the tool calls the model made
        #[arg(long)]
        trace: bool,
    },

    /// Start an interactive chat session
    Chat,

    /// Show the outline of a course
    Outline {
        /// Course title or part of it
        course: String,
    },

    /// List loaded courses
    Courses,

    /// Start HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration and prompts
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_with_trace() {
        let cli = Cli::try_parse_from(["coursewise", "-vv", "ask", "What is MCP?", "--trace"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Ask { question, trace } => {
                assert_eq!(question, "What is MCP?");
                assert!(trace);
            }
            other => panic!("Expected ask, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_serve_defaults() {
        let cli = Cli::try_parse_from(["coursewise", "serve"]).unwrap();
        match cli.command {
            Commands::Serve { host, port } => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(port, 8000);
            }
            other => panic!("Expected serve, got {:?}", other),
        }
    }
}
