//! Ask command implementation.

use super::open_assistant;
use crate::cli::preflight::Operation;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use console::style;

/// Run the ask command.
pub async fn run_ask(question: &str, trace: bool, settings: Settings) -> Result<()> {
    let assistant = open_assistant(&settings, Operation::Ask).await?;

    let spinner = Output::spinner("Searching course materials...");
    let (response, outcome) = assistant.query_with_trace(question, None).await;
    spinner.finish_and_clear();

    println!("\n{}\n", response.answer);
    Output::sources(&response.sources);

    if trace {
        Output::header("Trace");
        Output::kv("Model calls", &outcome.model_calls.to_string());
        Output::kv("Tool rounds", &outcome.tool_rounds.to_string());
        Output::kv("Termination", &format!("{:?}", outcome.termination));
        for call in &outcome.tool_calls {
            let marker = if call.is_error {
                style("x").red()
            } else {
                style("+").green()
            };
            println!("  {} [round {}] {}", marker, call.round, call);
        }
    }

    Ok(())
}
