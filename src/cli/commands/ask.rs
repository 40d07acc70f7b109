//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, settings: Settings) -> Result<()> {
    preflight::check(Operation::Ask, &settings)?;

    let orchestrator = Orchestrator::new(settings).await?;

    if orchestrator.vector_store().document_count().await? == 0 {
        Output::warning("The index is empty. Run 'pdfrag index' first.");
    }

    let spinner = Output::spinner("Thinking...");
    let response = orchestrator.build_agent().chat(question).await;
    spinner.finish_and_clear();
    let response = response?;

    Output::tool_calls(&response.tool_calls);
    println!("\n{}\n", response.content);

    Ok(())
}
