//! RAG (Retrieval-Augmented Generation) for question answering with sources.
//!
//! Provides the query engine that answers questions from the indexed documents.

pub mod context;
mod engine;

pub use context::ContextBuilder;
pub use engine::{QueryEngine, QueryResponse, EMPTY_RESPONSE};

#[cfg(test)]
pub(crate) use engine::testing as engine_testing;

use crate::vector_store::SearchResult;

/// A retrieved chunk with display metadata.
#[derive(Debug, Clone)]
pub struct ContextChunk {
    /// Source file name.
    pub file_name: String,
    /// 1-based page number.
    pub page_label: u32,
    /// Text content.
    pub content: String,
    /// Similarity score.
    pub score: f32,
}

impl ContextChunk {
    /// Short source reference, e.g. `guide.pdf p.2`.
    pub fn citation(&self) -> String {
        format!("{} p.{}", self.file_name, self.page_label)
    }
}

impl From<SearchResult> for ContextChunk {
    fn from(result: SearchResult) -> Self {
        Self {
            file_name: result.node.metadata.file_name,
            page_label: result.node.metadata.page_label,
            content: result.node.content,
            score: result.score,
        }
    }
}
