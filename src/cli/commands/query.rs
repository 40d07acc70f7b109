//! Query command: the query engine without the agent.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the query command.
pub async fn run_query(question: &str, top_k: Option<usize>, mut settings: Settings) -> Result<()> {
    preflight::check(Operation::Ask, &settings)?;

    if let Some(k) = top_k {
        settings.retrieval.similarity_top_k = k;
    }

    let orchestrator = Orchestrator::new(settings).await?;
    let engine = orchestrator.query_engine();

    let spinner = Output::spinner("Searching documents...");
    let response = engine.query(question).await;
    spinner.finish_and_clear();
    let response = response?;

    println!("\n{}\n", response.answer);

    if !response.sources.is_empty() {
        Output::header("Sources");
        for source in &response.sources {
            Output::search_result(&source.citation(), source.score, &source.content);
        }
        println!();
    }

    Ok(())
}
