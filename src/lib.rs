//! pdfrag - Question answering over a folder of PDFs
//!
//! Loads PDF documents, indexes them into Elasticsearch with Amazon Bedrock
//! embeddings, and answers questions through a tool-calling agent.
//!
//! # Overview
//!
//! pdfrag allows you to:
//! - Index every PDF in a folder, one document per page
//! - Ask questions answered from the indexed text
//! - Let an agent combine arithmetic tools with document retrieval
//! - Search the index semantically
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `document` - PDF loading
//! - `chunking` - Sentence-aware chunking
//! - `bedrock` - Shared Bedrock client
//! - `embedding` - Embedding generation
//! - `llm` - Chat model abstraction with tool use
//! - `vector_store` - Vector store abstraction (Elasticsearch, memory)
//! - `rag` - Query engine
//! - `agent` - Tools and the agent loop
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use pdfrag::config::Settings;
//! use pdfrag::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let input_dir = settings.input_dir();
//!     let orchestrator = Orchestrator::new(settings).await?;
//!
//!     let result = orchestrator
//!         .run(input_dir, false, "What is 20 + (2 * 4)?")
//!         .await?;
//!     println!("{}", result.response.content);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod bedrock;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod rag;
pub mod vector_store;

pub use error::{PdfragError, Result};
