//! Pre-flight checks before expensive operations.
//!
//! Validates that the store and model configuration is complete
//! before starting operations that would otherwise fail midway.

use crate::config::{Settings, VectorStoreProvider, REQUIRED_ENV_VARS};
use crate::error::{PdfragError, Result};
use std::path::PathBuf;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Indexing needs the store and the embedding model.
    Index,
    /// Asking questions also needs the chat model.
    Ask,
    /// Search needs the store and the embedding model.
    Search,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    check_store(settings)?;
    require("embedding model", &settings.bedrock.embedding_model, "AWS_BEDROCK_EMBEDDING_MODEL")?;

    match operation {
        Operation::Ask => {
            require("chat model", &settings.bedrock.llm_model, "AWS_BEDROCK_LLM_MODEL")?;
        }
        Operation::Index | Operation::Search => {}
    }
    Ok(())
}

/// Check the Elasticsearch connection settings when that store is in use.
fn check_store(settings: &Settings) -> Result<()> {
    if settings.vector_store.provider != VectorStoreProvider::Elasticsearch {
        return Ok(());
    }
    require("Elasticsearch host", &settings.elastic.host, "ELASTIC_HOST")?;
    require("index name", &settings.elastic.index_name, "INDEX_NAME")?;
    Ok(())
}

fn require(what: &str, value: &str, env_var: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PdfragError::Config(format!(
            "No {} configured. Set it with: export {}='...'",
            what, env_var
        )));
    }
    Ok(())
}

/// Required variables that are unset or empty according to `lookup`.
pub fn missing_env_vars<F>(lookup: F) -> Vec<&'static str>
where
    F: Fn(&str) -> Option<String>,
{
    REQUIRED_ENV_VARS
        .iter()
        .copied()
        .filter(|key| lookup(key).map_or(true, |v| v.trim().is_empty()))
        .collect()
}

/// Describe where AWS credentials will come from, if anywhere obvious.
pub fn aws_credentials_source() -> Option<String> {
    let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

    if env("AWS_ACCESS_KEY_ID").is_some() && env("AWS_SECRET_ACCESS_KEY").is_some() {
        return Some("environment variables".to_string());
    }
    if let Some(profile) = env("AWS_PROFILE") {
        return Some(format!("profile '{}'", profile));
    }
    if env("AWS_WEB_IDENTITY_TOKEN_FILE").is_some() {
        return Some("web identity token".to_string());
    }

    let aws_dir = dirs::home_dir().map(|h| h.join(".aws"))?;
    ["credentials", "config"]
        .iter()
        .map(|f| aws_dir.join(f))
        .find(|p: &PathBuf| p.exists())
        .map(|p| p.display().to_string())
}
