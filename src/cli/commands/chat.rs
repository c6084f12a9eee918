//! Interactive chat command.

use super::open_assistant;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
///
/// All questions share one session, so follow-ups see the recent exchanges.
pub async fn run_chat(settings: Settings) -> Result<()> {
    let assistant = open_assistant(&settings, Operation::Ask).await?;
    let session_id = assistant.sessions().create_session();

    println!("\n{}", style("Coursewise Chat").bold().cyan());
    println!(
        "{}\n",
        style("Type your questions, or 'exit' to quit. Use 'clear' to reset conversation.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            assistant.sessions().clear(&session_id);
            Output::info("Conversation history cleared.");
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let response = assistant.query(input, Some(&session_id)).await;
        spinner.finish_and_clear();

        println!("\n{} {}", style("Coursewise:").cyan().bold(), response.answer);
        Output::sources(&response.sources);
        println!();
    }

    Ok(())
}
