//! Document source: plain-text files under a folder.
//!
//! Text extraction from PDFs and scans happens upstream; this source only
//! picks up files that already hold text.

use crate::types::Document;
use std::fs;
use std::path::{Path, PathBuf};
use vaultqa_core::{AppError, AppResult};
use walkdir::WalkDir;

/// Text file formats the source reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Markdown,
    PlainText,
    Unsupported,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("md") | Some("markdown") => Self::Markdown,
            Some("txt") | Some("text") => Self::PlainText,
            _ => Self::Unsupported,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// Yields one [`Document`] per readable text file under `root`, ordered by
/// relative path.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read every supported file. Unreadable or binary files are skipped
    /// with a warning; a missing folder is a configuration error.
    pub fn documents(&self) -> AppResult<Vec<Document>> {
        if !self.root.is_dir() {
            return Err(AppError::Config(format!(
                "Documents folder {:?} does not exist. Create it and add .txt or .md files.",
                self.root
            )));
        }

        let mut paths: Vec<(String, PathBuf)> = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| ContentType::from_path(entry.path()).is_supported())
            .map(|entry| {
                let path = entry.into_path();
                (self.source_name(&path), path)
            })
            .collect();

        paths.sort_by(|a, b| a.0.cmp(&b.0));

        let mut documents = Vec::with_capacity(paths.len());
        for (source, path) in paths {
            match read_text(&path) {
                Ok(text) => documents.push(Document::new(source, text)),
                Err(e) => tracing::warn!("Skipping {:?}: {}", path, e),
            }
        }

        tracing::info!(
            "Found {} documents under {:?}",
            documents.len(),
            self.root
        );
        Ok(documents)
    }

    /// Path relative to the root with `/` separators.
    fn source_name(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn read_text(path: &Path) -> AppResult<String> {
    let raw = fs::read_to_string(path)?;
    if !is_likely_text(&raw) {
        return Err(AppError::Other("binary content".to_string()));
    }
    Ok(raw)
}

/// Heuristic: text files do not contain NUL.
fn is_likely_text(data: &str) -> bool {
    !data.contains('\0')
}
