//! Source documents and the folder loader that produces them.

mod loader;

pub use loader::DirectoryLoader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Text of one page of a loaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    /// File name without directories, shown in citations.
    pub file_name: String,
    /// Path the file was read from, used as the source key in the store.
    pub file_path: PathBuf,
    /// 1-based page number.
    pub page_label: u32,
    /// Number of pages in the file.
    pub total_pages: u32,
    /// Extracted text.
    pub text: String,
}
