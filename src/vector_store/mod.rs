//! Vector store abstraction for pdfrag.
//!
//! Provides a trait-based interface over the Elasticsearch index and an
//! in-process store used for tests and throwaway runs.

mod elasticsearch;
mod memory;

pub use elasticsearch::ElasticsearchStore;
pub use memory::MemoryVectorStore;

use crate::chunking::TextChunk;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a node came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeMetadata {
    /// Source file name.
    pub file_name: String,
    /// Source file path as loaded.
    pub file_path: String,
    /// 1-based page number.
    pub page_label: u32,
    /// Order of this chunk within its file.
    pub chunk_order: i32,
    /// When this node was indexed.
    pub indexed_at: DateTime<Utc>,
}

/// A chunk stored in the vector database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique node ID, also the Elasticsearch `_id`.
    pub id: Uuid,
    /// Text content of this chunk.
    pub content: String,
    /// Embedding vector. Empty on nodes returned by Elasticsearch searches.
    #[serde(default)]
    pub embedding: Vec<f32>,
    pub metadata: NodeMetadata,
}

impl Node {
    /// Create a node from a chunk and its embedding.
    pub fn new(chunk: TextChunk, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: chunk.content,
            embedding,
            metadata: NodeMetadata {
                file_name: chunk.file_name,
                file_path: chunk.file_path.display().to_string(),
                page_label: chunk.page_label,
                chunk_order: chunk.order,
                indexed_at: Utc::now(),
            },
        }
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched node.
    pub node: Node,
    /// Similarity score (higher is better). Scale depends on the backend.
    pub score: f32,
}

/// Summary information about an indexed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedSource {
    /// Source path, the key a file's nodes are stored under.
    pub file_path: String,
    /// File name for display.
    pub file_name: String,
    /// Number of indexed chunks.
    pub chunk_count: u32,
    /// Number of distinct pages with indexed text.
    pub page_count: u32,
    /// Most recent indexing time, when known.
    pub indexed_at: Option<DateTime<Utc>>,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the backing index if it does not exist yet.
    async fn ensure_index(&self, dimensions: usize) -> Result<()>;

    /// Bulk upsert nodes.
    async fn upsert_batch(&self, nodes: &[Node]) -> Result<usize>;

    /// Search for similar nodes.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        self.search_with_threshold(query_embedding, limit, f32::NEG_INFINITY)
            .await
    }

    /// Search with a minimum similarity threshold.
    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>>;

    /// Delete the nodes stored under a source path, except the ids in `keep`.
    async fn delete_by_source(&self, file_path: &str, keep: &[Uuid]) -> Result<usize>;

    /// List all indexed files, sorted by path.
    async fn list_sources(&self) -> Result<Vec<IndexedSource>>;

    /// Check if anything is stored under a source path.
    async fn is_source_indexed(&self, file_path: &str) -> Result<bool>;

    /// Get total node count.
    async fn document_count(&self) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
pub(crate) fn test_node(file_name: &str, page: u32, content: &str, embedding: Vec<f32>) -> Node {
    Node::new(
        TextChunk {
            content: content.to_string(),
            file_name: file_name.to_string(),
            file_path: std::path::PathBuf::from("data").join(file_name),
            page_label: page,
            order: page as i32 - 1,
        },
        embedding,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_node_from_chunk() {
        let node = test_node("guide.pdf", 4, "Some text", vec![0.5; 3]);
        assert_eq!(node.metadata.file_name, "guide.pdf");
        assert_eq!(node.metadata.page_label, 4);
        assert_eq!(node.metadata.chunk_order, 3);
        assert!(node.metadata.file_path.ends_with("guide.pdf"));
    }

    #[test]
    fn test_node_without_embedding_deserializes() {
        let json = serde_json::json!({
            "id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "content": "text",
            "metadata": {
                "file_name": "a.pdf",
                "file_path": "data/a.pdf",
                "page_label": 1,
                "chunk_order": 0,
                "indexed_at": "2024-05-01T12:00:00Z"
            }
        });
        let node: Node = serde_json::from_value(json).unwrap();
        assert!(node.embedding.is_empty());
        assert_eq!(node.metadata.file_name, "a.pdf");
    }
}
