//! Configuration settings for pdfrag.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable holding the Elasticsearch endpoint.
pub const ENV_ELASTIC_HOST: &str = "ELASTIC_HOST";
/// Environment variable holding the Elasticsearch user.
pub const ENV_ELASTIC_USERNAME: &str = "ELASTIC_USERNAME";
/// Environment variable holding the Elasticsearch password.
pub const ENV_ELASTIC_PASSWORD: &str = "ELASTIC_PASSWORD";
/// Environment variable holding the Elasticsearch index name.
pub const ENV_INDEX_NAME: &str = "INDEX_NAME";
/// Environment variable holding the Bedrock embedding model ID.
pub const ENV_EMBEDDING_MODEL: &str = "AWS_BEDROCK_EMBEDDING_MODEL";
/// Environment variable holding the Bedrock chat model ID.
pub const ENV_LLM_MODEL: &str = "AWS_BEDROCK_LLM_MODEL";
/// Environment variable holding the AWS region.
pub const ENV_AWS_REGION: &str = "AWS_REGION";

/// Variables that must resolve to a non-empty value before talking to the services.
pub const REQUIRED_ENV_VARS: &[&str] = &[
    ENV_ELASTIC_HOST,
    ENV_ELASTIC_USERNAME,
    ENV_ELASTIC_PASSWORD,
    ENV_INDEX_NAME,
    ENV_EMBEDDING_MODEL,
    ENV_LLM_MODEL,
];

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub elastic: ElasticSettings,
    pub bedrock: BedrockSettings,
    pub documents: DocumentSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub agent: AgentSettings,
    pub vector_store: VectorStoreSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level used when no `-v` flag is given (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Elasticsearch connection settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticSettings {
    /// Base URL of the cluster, e.g. `https://localhost:9200`.
    pub host: String,
    pub username: String,
    pub password: String,
    /// Index used as the vector store.
    pub index_name: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Accept self-signed certificates (local clusters).
    pub insecure: bool,
}

impl Default for ElasticSettings {
    fn default() -> Self {
        Self {
            host: "http://localhost:9200".to_string(),
            username: "elastic".to_string(),
            password: String::new(),
            index_name: "pdfrag".to_string(),
            timeout_seconds: 60,
            insecure: false,
        }
    }
}

impl std::fmt::Debug for ElasticSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticSettings")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("index_name", &self.index_name)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("insecure", &self.insecure)
            .finish()
    }
}

/// AWS Bedrock model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BedrockSettings {
    /// AWS region. Falls back to the SDK's region chain when empty.
    pub region: String,
    /// Embedding model ID.
    pub embedding_model: String,
    /// Embedding dimensions (Titan v2 accepts 256, 512 or 1024).
    pub embedding_dimensions: u32,
    /// Chat model ID used by the agent and the query engine.
    pub llm_model: String,
    /// Sampling temperature for chat calls.
    pub temperature: f32,
    /// Maximum tokens per chat reply.
    pub max_tokens: i32,
    /// Maximum concurrent embedding requests.
    pub max_concurrent_requests: usize,
    /// Per-operation timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for BedrockSettings {
    fn default() -> Self {
        Self {
            region: String::new(),
            embedding_model: "amazon.titan-embed-text-v2:0".to_string(),
            embedding_dimensions: 1024,
            llm_model: "anthropic.claude-3-haiku-20240307-v1:0".to_string(),
            temperature: 0.1,
            max_tokens: 2048,
            max_concurrent_requests: 4,
            timeout_seconds: 300,
        }
    }
}

/// Document loading settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    /// Folder scanned for documents.
    pub input_dir: String,
    /// File extensions to load (without the dot).
    pub extensions: Vec<String>,
    /// Descend into subdirectories.
    pub recursive: bool,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            input_dir: "./data".to_string(),
            extensions: vec!["pdf".to_string()],
            recursive: false,
        }
    }
}

/// Text chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Maximum chunk size in words.
    pub chunk_size: usize,
    /// Words shared between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 20,
        }
    }
}

/// Retrieval settings for the query engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of nodes retrieved per query.
    pub similarity_top_k: usize,
    /// Minimum similarity score for a node to be used as context.
    pub min_score: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            similarity_top_k: 2,
            min_score: 0.0,
        }
    }
}

/// Agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Upper bound on model calls per question.
    pub max_iterations: usize,
    /// Question asked by `pdfrag run` when none is given.
    pub default_question: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            default_question: "What is 20 + (2 * 4)? Then summarize the indexed documents in one sentence."
                .to_string(),
        }
    }
}

/// Vector store backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreProvider {
    /// Remote Elasticsearch index (default).
    #[default]
    Elasticsearch,
    /// In-process store, lost at exit.
    Memory,
}

impl std::str::FromStr for VectorStoreProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "elasticsearch" | "elastic" | "es" => Ok(VectorStoreProvider::Elasticsearch),
            "memory" => Ok(VectorStoreProvider::Memory),
            _ => Err(format!("Unknown vector store provider: {}", s)),
        }
    }
}

impl std::fmt::Display for VectorStoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorStoreProvider::Elasticsearch => write!(f, "elasticsearch"),
            VectorStoreProvider::Memory => write!(f, "memory"),
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VectorStoreSettings {
    pub provider: VectorStoreProvider,
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file, then apply environment overrides.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Settings>(&content)?
        } else {
            Settings::default()
        };

        settings.apply_env();
        Ok(settings)
    }

    /// Override settings from process environment variables.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Override settings from an arbitrary variable lookup. Empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_ELASTIC_HOST) {
            self.elastic.host = v;
        }
        if let Some(v) = get(ENV_ELASTIC_USERNAME) {
            self.elastic.username = v;
        }
        if let Some(v) = get(ENV_ELASTIC_PASSWORD) {
            self.elastic.password = v;
        }
        if let Some(v) = get(ENV_INDEX_NAME) {
            self.elastic.index_name = v;
        }
        if let Some(v) = get(ENV_EMBEDDING_MODEL) {
            self.bedrock.embedding_model = v;
        }
        if let Some(v) = get(ENV_LLM_MODEL) {
            self.bedrock.llm_model = v;
        }
        if let Some(v) = get(ENV_AWS_REGION) {
            self.bedrock.region = v;
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::PdfragError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pdfrag")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Tracing filter for the crate. `-v` flags win over `general.log_level`.
    pub fn log_filter(&self, verbose: u8) -> String {
        let level = match verbose {
            0 => self.general.log_level.trim(),
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        format!("pdfrag={}", if level.is_empty() { "warn" } else { level })
    }

    /// Get the expanded document input directory.
    pub fn input_dir(&self) -> PathBuf {
        Self::expand_path(&self.documents.input_dir)
    }

    /// Copy of the settings safe to print (password masked).
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.elastic.password.is_empty() {
            copy.elastic.password = "********".to_string();
        }
        copy
    }
}
