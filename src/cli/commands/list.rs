//! List command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    preflight::check(Operation::Search, &settings)?;

    let orchestrator = Orchestrator::new(settings).await?;
    let sources = orchestrator.vector_store().list_sources().await?;

    if sources.is_empty() {
        Output::info("No documents indexed yet. Use 'pdfrag index' to add a folder of PDFs.");
        return Ok(());
    }

    Output::header(&format!("Indexed Files ({})", sources.len()));
    println!();

    for source in &sources {
        let indexed_at = source
            .indexed_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string());
        Output::source_info(
            &source.file_path,
            source.page_count,
            source.chunk_count,
            indexed_at.as_deref(),
        );
    }

    let total_chunks: u32 = sources.iter().map(|s| s.chunk_count).sum();
    println!();
    Output::kv("Total files", &sources.len().to_string());
    Output::kv("Total chunks", &total_chunks.to_string());

    Ok(())
}
