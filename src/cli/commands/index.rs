//! Index command implementation.

use super::resolve_dir;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the index command.
pub async fn run_index(
    dir: Option<String>,
    recursive: bool,
    skip_existing: bool,
    settings: Settings,
) -> Result<()> {
    preflight::check(Operation::Index, &settings)?;

    let dir = resolve_dir(dir, &settings);
    let recursive = recursive || settings.documents.recursive;
    let orchestrator = Orchestrator::new(settings).await?;

    let spinner = Output::spinner(&format!("Loading documents from {}...", dir.display()));
    let documents = orchestrator.load_documents(dir, recursive).await;
    spinner.finish_and_clear();
    let documents = documents?;

    let spinner = Output::spinner(&format!("Embedding and indexing {} page(s)...", documents.len()));
    let report = orchestrator.index_documents(documents, skip_existing).await;
    spinner.finish_and_clear();
    let report = report?;

    if report.chunks_indexed == 0 && report.files_skipped == report.files_loaded {
        Output::info("Everything is already indexed.");
    } else {
        Output::success("Indexing complete");
    }
    Output::index_report(&report);

    Ok(())
}
