//! Folder loader for PDF files.

use super::SourceDocument;
use crate::error::{PdfragError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

/// Loads every matching file in a folder, one document per page.
pub struct DirectoryLoader {
    input_dir: PathBuf,
    extensions: Vec<String>,
    recursive: bool,
}

impl DirectoryLoader {
    /// Create a loader for `input_dir` that reads `.pdf` files.
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            extensions: vec!["pdf".to_string()],
            recursive: false,
        }
    }

    /// Restrict loading to the given extensions (with or without a leading dot).
    pub fn with_extensions(mut self, extensions: &[String]) -> Self {
        self.extensions = extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    /// Descend into subdirectories.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Check whether a path carries one of the configured extensions.
    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }

    /// List matching files, sorted by path.
    pub fn collect_files(&self) -> Result<Vec<PathBuf>> {
        if !self.input_dir.is_dir() {
            return Err(PdfragError::NotFound(format!(
                "Directory not found: {}",
                self.input_dir.display()
            )));
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.input_dir).max_depth(max_depth) {
            let entry = entry.map_err(|e| PdfragError::Io(e.into()))?;
            if entry.file_type().is_file() && self.matches_extension(entry.path()) {
                files.push(entry.into_path());
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(PdfragError::InvalidInput(format!(
                "No files found in {} matching extensions: {}",
                self.input_dir.display(),
                self.extensions.join(", ")
            )));
        }

        Ok(files)
    }

    /// Load all matching files.
    #[instrument(skip(self), fields(dir = %self.input_dir.display()))]
    pub fn load(&self) -> Result<Vec<SourceDocument>> {
        let files = self.collect_files()?;
        info!("Loading {} file(s)", files.len());

        let mut documents = Vec::new();
        for path in &files {
            documents.extend(load_pdf(path)?);
        }

        info!("Loaded {} page document(s)", documents.len());
        Ok(documents)
    }
}

/// Extract a PDF into per-page documents.
pub fn load_pdf(path: &Path) -> Result<Vec<SourceDocument>> {
    let bytes = std::fs::read(path)?;
    let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
        .map_err(|e| PdfragError::Document(format!("{}: {}", path.display(), e)))?;

    debug!("{}: {} page(s)", path.display(), pages.len());
    Ok(documents_from_pages(path, pages))
}

/// Turn extracted page texts into documents, dropping blank pages.
pub fn documents_from_pages(path: &Path, pages: Vec<String>) -> Vec<SourceDocument> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let total_pages = pages.len() as u32;

    pages
        .into_iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(i, text)| SourceDocument {
            file_name: file_name.clone(),
            file_path: path.to_path_buf(),
            page_label: i as u32 + 1,
            total_pages,
            text: text.trim().to_string(),
        })
        .collect()
}
