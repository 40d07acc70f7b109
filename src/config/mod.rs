//! Configuration module for pdfrag.
//!
//! Handles loading settings from TOML and the environment, and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AgentPrompts, Prompts, QueryPrompts};
pub use settings::{
    AgentSettings, BedrockSettings, ChunkingSettings, DocumentSettings, ElasticSettings,
    GeneralSettings, PromptSettings, RetrievalSettings, Settings, VectorStoreProvider,
    VectorStoreSettings, ENV_AWS_REGION, ENV_ELASTIC_HOST, ENV_ELASTIC_PASSWORD,
    ENV_ELASTIC_USERNAME, ENV_EMBEDDING_MODEL, ENV_INDEX_NAME, ENV_LLM_MODEL, REQUIRED_ENV_VARS,
};
