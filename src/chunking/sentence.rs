//! Sentence-aware splitting.
//!
//! Text is cut at sentence and paragraph boundaries, then sentences are packed
//! into chunks of at most `chunk_size` words. The last `chunk_overlap` words of
//! each chunk are repeated at the start of the next one.

use super::{ChunkingConfig, TextChunk};
use crate::document::SourceDocument;
use crate::error::{PdfragError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

fn sentence_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"[.!?]+["')\]]*\s+|\n\s*\n"#).expect("sentence boundary regex is valid")
    })
}

/// Splits text into overlapping chunks along sentence boundaries.
pub struct SentenceSplitter {
    config: ChunkingConfig,
}

impl SentenceSplitter {
    /// Create a splitter, rejecting an overlap that is not smaller than the chunk size.
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(PdfragError::Config("chunk_size must be positive".to_string()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(PdfragError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        Ok(Self { config })
    }

    /// Split a single text into chunk strings.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let size = self.config.chunk_size;

        // Sentences longer than a chunk are cut on word boundaries.
        let pieces: Vec<Vec<&str>> = split_sentences(text)
            .into_iter()
            .flat_map(|sentence| {
                let words: Vec<&str> = sentence.split_whitespace().collect();
                words.chunks(size).map(|c| c.to_vec()).collect::<Vec<_>>()
            })
            .collect();

        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut has_new_content = false;

        for piece in pieces {
            if !current.is_empty() && current.len() + piece.len() > size {
                chunks.push(current.join(" "));

                let keep = self.config.chunk_overlap.min(size - piece.len());
                current = current.split_off(current.len().saturating_sub(keep));
                has_new_content = false;
            }
            current.extend(piece);
            has_new_content = true;
        }

        if has_new_content {
            chunks.push(current.join(" "));
        }

        chunks
    }

    /// Split page documents into chunks, numbering them per file.
    pub fn split_documents(&self, documents: &[SourceDocument]) -> Vec<TextChunk> {
        let mut order_by_file: HashMap<&str, i32> = HashMap::new();
        let mut chunks = Vec::new();

        for doc in documents {
            for content in self.split_text(&doc.text) {
                let order = order_by_file.entry(doc.file_name.as_str()).or_insert(0);
                chunks.push(TextChunk::from_document(doc, content, *order));
                *order += 1;
            }
        }

        chunks
    }
}

/// Split text into trimmed, non-empty sentences.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in sentence_boundary().find_iter(text) {
        let sentence = text[start..m.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = m.end();
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}
