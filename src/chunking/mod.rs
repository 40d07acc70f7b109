//! Text chunking for breaking page text into embeddable pieces.

mod sentence;

pub use sentence::SentenceSplitter;

use crate::document::SourceDocument;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A chunk of text from one page of a source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    /// Text content of this chunk.
    pub content: String,
    /// File name of the source.
    pub file_name: String,
    /// Path of the source.
    pub file_path: PathBuf,
    /// 1-based page the chunk came from.
    pub page_label: u32,
    /// Order of this chunk within its file.
    pub order: i32,
}

impl TextChunk {
    /// Create a chunk carrying the source document's metadata.
    pub fn from_document(doc: &SourceDocument, content: String, order: i32) -> Self {
        Self {
            content,
            file_name: doc.file_name.clone(),
            file_path: doc.file_path.clone(),
            page_label: doc.page_label,
            order,
        }
    }
}

/// Configuration for chunking.
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Maximum words per chunk.
    pub chunk_size: usize,
    /// Words carried over between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 20,
        }
    }
}

impl From<&crate::config::ChunkingSettings> for ChunkingConfig {
    fn from(settings: &crate::config::ChunkingSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
        }
    }
}
