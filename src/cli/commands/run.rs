//! Run command: the whole pipeline in one pass.

use super::resolve_dir;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Load the folder, index it, and answer one question with the agent.
pub async fn run_pipeline(question: Option<String>, dir: Option<String>, settings: Settings) -> Result<()> {
    preflight::check(Operation::Index, &settings)?;
    preflight::check(Operation::Ask, &settings)?;

    let dir = resolve_dir(dir, &settings);
    let recursive = settings.documents.recursive;
    let question = question.unwrap_or_else(|| settings.agent.default_question.clone());

    let orchestrator = Orchestrator::new(settings).await?;

    let spinner = Output::spinner(&format!("Loading documents from {}...", dir.display()));
    let documents = orchestrator.load_documents(dir, recursive).await;
    spinner.finish_and_clear();
    let documents = documents?;

    let spinner = Output::spinner(&format!("Indexing {} page(s)...", documents.len()));
    let report = orchestrator.index_documents(documents, false).await;
    spinner.finish_and_clear();
    let report = report?;

    Output::success("Indexing complete");
    Output::index_report(&report);

    Output::header("Question");
    println!("{}", question);

    let spinner = Output::spinner("Thinking...");
    let response = orchestrator.build_agent().chat(&question).await;
    spinner.finish_and_clear();
    let response = response?;

    Output::tool_calls(&response.tool_calls);
    Output::header("Answer");
    println!("{}\n", response.content);

    Ok(())
}
