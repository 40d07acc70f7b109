//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::rag::ContextBuilder;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, limit: usize, min_score: f32, settings: Settings) -> Result<()> {
    preflight::check(Operation::Search, &settings)?;

    let orchestrator = Orchestrator::new(settings).await?;

    let context_builder = ContextBuilder::new(orchestrator.vector_store(), orchestrator.embedder())
        .with_top_k(limit)
        .with_min_score(min_score);

    let spinner = Output::spinner("Searching...");
    let results = context_builder.build(query).await;
    spinner.finish_and_clear();
    let chunks = results?;

    if chunks.is_empty() {
        Output::warning("No results found matching your query.");
    } else {
        Output::success(&format!("Found {} results", chunks.len()));

        for chunk in &chunks {
            Output::search_result(&chunk.citation(), chunk.score, &chunk.content);
        }
    }

    Ok(())
}
