//! In-memory vector store implementation.
//!
//! Useful for testing and single-shot runs that don't need persistence.

use super::{cosine_similarity, IndexedSource, Node, SearchResult, VectorStore};
use crate::error::{PdfragError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// In-memory vector store.
pub struct MemoryVectorStore {
    nodes: RwLock<HashMap<Uuid, Node>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<Uuid, Node>>> {
        self.nodes
            .read()
            .map_err(|_| PdfragError::VectorStore("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<Uuid, Node>>> {
        self.nodes
            .write()
            .map_err(|_| PdfragError::VectorStore("memory store lock poisoned".to_string()))
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn ensure_index(&self, _dimensions: usize) -> Result<()> {
        Ok(())
    }

    async fn upsert_batch(&self, nodes: &[Node]) -> Result<usize> {
        let mut store = self.write()?;
        for node in nodes {
            store.insert(node.id, node.clone());
        }
        Ok(nodes.len())
    }

    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let nodes = self.read()?;

        let mut results: Vec<SearchResult> = nodes
            .values()
            .map(|node| SearchResult {
                node: node.clone(),
                score: cosine_similarity(query_embedding, &node.embedding),
            })
            .filter(|r| r.score >= min_score)
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        Ok(results)
    }

    async fn delete_by_source(&self, file_path: &str, keep: &[Uuid]) -> Result<usize> {
        let mut nodes = self.write()?;
        let initial_len = nodes.len();
        nodes.retain(|id, node| node.metadata.file_path != file_path || keep.contains(id));
        Ok(initial_len - nodes.len())
    }

    async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        let nodes = self.read()?;

        let mut by_file: HashMap<&str, (IndexedSource, HashSet<u32>)> = HashMap::new();
        for node in nodes.values() {
            let (entry, pages) = by_file
                .entry(node.metadata.file_path.as_str())
                .or_insert_with(|| {
                    (
                        IndexedSource {
                            file_path: node.metadata.file_path.clone(),
                            file_name: node.metadata.file_name.clone(),
                            chunk_count: 0,
                            page_count: 0,
                            indexed_at: None,
                        },
                        HashSet::new(),
                    )
                });

            entry.chunk_count += 1;
            pages.insert(node.metadata.page_label);
            if entry.indexed_at.map_or(true, |t| node.metadata.indexed_at > t) {
                entry.indexed_at = Some(node.metadata.indexed_at);
            }
        }

        let mut sources: Vec<IndexedSource> = by_file
            .into_values()
            .map(|(mut source, pages)| {
                source.page_count = pages.len() as u32;
                source
            })
            .collect();
        sources.sort_by(|a, b| a.file_path.cmp(&b.file_path));

        Ok(sources)
    }

    async fn is_source_indexed(&self, file_path: &str) -> Result<bool> {
        let nodes = self.read()?;
        Ok(nodes.values().any(|n| n.metadata.file_path == file_path))
    }

    async fn document_count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::test_node;

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new();

        let nodes = vec![
            test_node("a.pdf", 1, "Hello world", vec![1.0, 0.0, 0.0]),
            test_node("a.pdf", 2, "Goodbye world", vec![0.0, 1.0, 0.0]),
            test_node("b.pdf", 1, "Other file", vec![0.7, 0.7, 0.0]),
        ];
        store.upsert_batch(&nodes).await.unwrap();

        assert_eq!(store.document_count().await.unwrap(), 3);

        let results = store.search(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].node.content, "Hello world");
        assert_eq!(results[1].node.content, "Other file");
        assert!(results[0].score > results[1].score);

        let filtered = store
            .search_with_threshold(&[1.0, 0.0, 0.0], 10, 0.5)
            .await
            .unwrap();
        assert_eq!(filtered.len(), 2);

        let sources = store.list_sources().await.unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].file_name, "a.pdf");
        assert_eq!(sources[0].file_path, std::path::Path::new("data").join("a.pdf").display().to_string());
        assert_eq!(sources[0].chunk_count, 2);
        assert_eq!(sources[0].page_count, 2);
        assert!(sources[0].indexed_at.is_some());
    }

    #[tokio::test]
    async fn test_delete_by_source() {
        let store = MemoryVectorStore::new();
        let kept = test_node("a.pdf", 3, "new", vec![1.0]);
        store
            .upsert_batch(&[
                test_node("a.pdf", 1, "one", vec![1.0]),
                test_node("a.pdf", 2, "two", vec![1.0]),
                kept.clone(),
                test_node("b.pdf", 1, "three", vec![1.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.delete_by_source("data/a.pdf", &[kept.id]).await.unwrap(), 2);
        assert!(store.is_source_indexed("data/a.pdf").await.unwrap());
        assert_eq!(store.delete_by_source("data/a.pdf", &[]).await.unwrap(), 1);
        assert!(!store.is_source_indexed("data/a.pdf").await.unwrap());
        assert!(store.is_source_indexed("data/b.pdf").await.unwrap());
        assert_eq!(store.delete_by_source("data/missing.pdf", &[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_same_name_in_different_folders() {
        let store = MemoryVectorStore::new();
        let mut first = test_node("report.pdf", 1, "first", vec![1.0]);
        first.metadata.file_path = "data/a/report.pdf".to_string();
        let mut second = test_node("report.pdf", 1, "second", vec![1.0]);
        second.metadata.file_path = "data/b/report.pdf".to_string();
        store.upsert_batch(&[first, second]).await.unwrap();

        let sources = store.list_sources().await.unwrap();
        let paths: Vec<_> = sources.iter().map(|s| s.file_path.as_str()).collect();
        assert_eq!(paths, vec!["data/a/report.pdf", "data/b/report.pdf"]);
        assert!(sources.iter().all(|s| s.file_name == "report.pdf"));

        assert_eq!(store.delete_by_source("data/a/report.pdf", &[]).await.unwrap(), 1);
        assert!(store.is_source_indexed("data/b/report.pdf").await.unwrap());
    }
}
