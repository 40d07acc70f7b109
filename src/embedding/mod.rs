//! Embedding generation for semantic search and retrieval.

mod bedrock;

pub use bedrock::{embedding_dimensions, BedrockEmbedder, EmbeddingFamily, InputType};

use crate::error::Result;
use async_trait::async_trait;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single document text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate an embedding for a search query.
    ///
    /// Models that distinguish queries from documents override this.
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.embed(query).await
    }

    /// Generate embeddings for multiple document texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}
