//! Doctor command - verify configuration and connectivity.

use crate::chunking::{ChunkingConfig, SentenceSplitter};
use crate::cli::preflight;
use crate::cli::Output;
use crate::config::{Settings, VectorStoreProvider, ENV_ELASTIC_PASSWORD};
use crate::document::DirectoryLoader;
use crate::embedding::{embedding_dimensions, EmbeddingFamily};
use crate::vector_store::{ElasticsearchStore, VectorStore};
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Print a section of checks and add them to the running list.
fn section(title: &str, results: Vec<CheckResult>, checks: &mut Vec<CheckResult>) {
    println!("{}", style(title).bold());
    for check in &results {
        check.print();
    }
    println!();
    checks.extend(results);
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("pdfrag Doctor");
    println!();
    println!("Checking configuration and connectivity...\n");

    let mut checks = Vec::new();

    section(
        "Environment",
        check_env_vars(|key| std::env::var(key).ok()),
        &mut checks,
    );
    section("Amazon Bedrock", check_bedrock(settings), &mut checks);
    section("Documents", check_documents(settings), &mut checks);
    section("Vector Store", check_vector_store(settings).await, &mut checks);
    section("Configuration", vec![check_config_file()], &mut checks);

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using pdfrag.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! pdfrag is ready to use.");
    }

    Ok(())
}

/// Report each required variable. Missing ones are warnings since the config file may supply them.
fn check_env_vars<F>(lookup: F) -> Vec<CheckResult>
where
    F: Fn(&str) -> Option<String>,
{
    let missing = preflight::missing_env_vars(&lookup);

    crate::config::REQUIRED_ENV_VARS
        .iter()
        .map(|key| {
            if missing.contains(key) {
                CheckResult::warning(
                    key,
                    "not set",
                    &format!("Add {}=... to .env or export it", key),
                )
            } else if *key == ENV_ELASTIC_PASSWORD {
                CheckResult::ok(key, "set (hidden)")
            } else {
                CheckResult::ok(key, &lookup(key).unwrap_or_default())
            }
        })
        .collect()
}

fn check_bedrock(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    results.push(match preflight::aws_credentials_source() {
        Some(source) => CheckResult::ok("Credentials", &format!("found ({})", source)),
        None => CheckResult::warning(
            "Credentials",
            "none found in the environment or ~/.aws",
            "Set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY, or AWS_PROFILE",
        ),
    });

    let region = if settings.bedrock.region.is_empty() {
        std::env::var("AWS_REGION")
            .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
            .unwrap_or_default()
    } else {
        settings.bedrock.region.clone()
    };
    results.push(if region.is_empty() {
        CheckResult::warning(
            "Region",
            "not set",
            "Set AWS_REGION or bedrock.region in the config file",
        )
    } else {
        CheckResult::ok("Region", &region)
    });

    let embedding_model = &settings.bedrock.embedding_model;
    let family = EmbeddingFamily::from_model_id(embedding_model);
    let dimensions = embedding_dimensions(embedding_model, settings.bedrock.embedding_dimensions);
    results.push(match (family, dimensions) {
        (Ok(family), Ok(dimensions)) => CheckResult::ok(
            "Embedding model",
            &format!("{} ({:?}, {} dimensions)", embedding_model, family, dimensions),
        ),
        (Err(e), _) | (_, Err(e)) => CheckResult::error(
            "Embedding model",
            &e.to_string(),
            "Use an amazon.titan-embed-* or cohere.embed-* model; Titan v2 takes 256, 512 or 1024 dimensions",
        ),
    });

    results.push(if settings.bedrock.llm_model.trim().is_empty() {
        CheckResult::error("Chat model", "not set", "Set AWS_BEDROCK_LLM_MODEL")
    } else {
        CheckResult::ok("Chat model", &settings.bedrock.llm_model)
    });

    results
}

fn check_documents(settings: &Settings) -> Vec<CheckResult> {
    let dir = settings.input_dir();
    let loader = DirectoryLoader::new(dir.clone())
        .with_extensions(&settings.documents.extensions)
        .recursive(settings.documents.recursive);

    let files = match loader.collect_files() {
        Ok(files) => CheckResult::ok(
            "Input directory",
            &format!("{} ({} file(s))", dir.display(), files.len()),
        ),
        Err(e) => CheckResult::warning(
            "Input directory",
            &e.to_string(),
            "Put PDFs in ./data or pass --dir to 'pdfrag index'",
        ),
    };

    let chunking = match SentenceSplitter::new(ChunkingConfig::from(&settings.chunking)) {
        Ok(_) => CheckResult::ok(
            "Chunking",
            &format!(
                "{} words, {} overlap",
                settings.chunking.chunk_size, settings.chunking.chunk_overlap
            ),
        ),
        Err(e) => CheckResult::error("Chunking", &e.to_string(), "Fix [chunking] in the config file"),
    };

    vec![files, chunking]
}

async fn check_vector_store(settings: &Settings) -> Vec<CheckResult> {
    if settings.vector_store.provider == VectorStoreProvider::Memory {
        return vec![CheckResult::warning(
            "Provider",
            "memory (nothing is kept between runs)",
            "Only 'pdfrag run' is useful with this provider",
        )];
    }

    let store = match ElasticsearchStore::new(&settings.elastic) {
        Ok(store) => store,
        Err(e) => {
            return vec![CheckResult::error(
                "Elasticsearch",
                &e.to_string(),
                "Check ELASTIC_HOST and INDEX_NAME",
            )]
        }
    };

    let mut results = Vec::new();
    match store.ping().await {
        Ok(version) => results.push(CheckResult::ok(
            "Elasticsearch",
            &format!("{} (version {})", settings.elastic.host, version),
        )),
        Err(e) => {
            results.push(CheckResult::error(
                "Elasticsearch",
                &e.to_string(),
                "Check ELASTIC_HOST, ELASTIC_USERNAME and ELASTIC_PASSWORD",
            ));
            return results;
        }
    }

    results.push(match store.document_count().await {
        Ok(0) => CheckResult::warning(
            "Index",
            &format!("'{}' is empty or missing", store.index_name()),
            "Run 'pdfrag index' to add documents",
        ),
        Ok(count) => CheckResult::ok(
            "Index",
            &format!("'{}' holds {} chunk(s)", store.index_name(), count),
        ),
        Err(e) => CheckResult::error("Index", &e.to_string(), "Check INDEX_NAME"),
    });

    results
}

fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();

    if config_path.exists() {
        CheckResult::ok("Config file", &config_path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            "not found (using defaults and environment)",
            "Create one with: pdfrag config init",
        )
    }
}
