//! Document loading.
//!
//! A loader turns one source file into page-level text units carrying
//! their page numbers. Loaders are the seam between the sync engine and
//! document formats: the engine only ever sees [`DocumentPage`]s.

use crate::error::SyncError;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// One page of extracted text. Page numbers are 1-based.
#[derive(Debug, Clone)]
pub struct DocumentPage {
    pub page_number: usize,
    pub text: String,
}

/// Converts a source file into page-level text units.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// The file extension this loader handles (without the dot).
    fn extension(&self) -> &str;

    /// Load and extract the document at `path`.
    ///
    /// A document with no extractable text yields an empty page list,
    /// not an error.
    async fn load(&self, path: &Path) -> Result<Vec<DocumentPage>, SyncError>;
}

/// Pick the loader for the configured source extension.
pub fn loader_for_extension(extension: &str) -> Arc<dyn DocumentLoader> {
    if extension.eq_ignore_ascii_case("pdf") {
        Arc::new(PdfLoader)
    } else {
        Arc::new(PlainTextLoader::new(extension))
    }
}

fn load_error(path: &Path, message: impl std::fmt::Display) -> SyncError {
    SyncError::Load {
        source_id: path.to_string_lossy().to_string(),
        message: message.to_string(),
    }
}

/// PDF text extraction via pdf-extract.
///
/// pdf-extract emits a form feed between pages, which is what the page
/// split below keys on. Extraction is CPU-bound, so it runs on the
/// blocking thread pool.
pub struct PdfLoader;

#[async_trait]
impl DocumentLoader for PdfLoader {
    fn extension(&self) -> &str {
        "pdf"
    }

    async fn load(&self, path: &Path) -> Result<Vec<DocumentPage>, SyncError> {
        debug!("Extracting PDF: {}", path.display());

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| load_error(path, e))?;

        let text = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| load_error(path, e))?
        .map_err(|e| load_error(path, e))?;

        Ok(split_pages(&text))
    }
}

/// Plain-text loader for text corpora.
///
/// The whole file is one page unless it contains form feeds, in which
/// case each form-feed-separated segment becomes a page.
pub struct PlainTextLoader {
    extension: String,
}

impl PlainTextLoader {
    pub fn new<S: Into<String>>(extension: S) -> Self {
        Self {
            extension: extension.into(),
        }
    }
}

#[async_trait]
impl DocumentLoader for PlainTextLoader {
    fn extension(&self) -> &str {
        &self.extension
    }

    async fn load(&self, path: &Path) -> Result<Vec<DocumentPage>, SyncError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| load_error(path, e))?;

        Ok(split_pages(&text))
    }
}

/// Split extracted text on form feeds into 1-based numbered pages,
/// dropping pages that contain no text at all.
fn split_pages(text: &str) -> Vec<DocumentPage> {
    text.split('\x0C')
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(i, page)| DocumentPage {
            page_number: i + 1,
            text: page.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_split_pages_form_feeds() {
        let pages = split_pages("first page\x0Csecond page\x0Cthird page");
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].page_number, 1);
        assert_eq!(pages[0].text, "first page");
        assert_eq!(pages[2].page_number, 3);
    }

    #[test]
    fn test_split_pages_preserves_numbers_over_blank_pages() {
        let pages = split_pages("content\x0C   \x0Cmore content");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].page_number, 1);
        assert_eq!(pages[1].page_number, 3);
    }

    #[test]
    fn test_split_pages_empty_input() {
        assert!(split_pages("").is_empty());
        assert!(split_pages("   \n  ").is_empty());
    }

    #[tokio::test]
    async fn test_plain_text_loader() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("notes.txt");
        tokio::fs::write(&path, "a single page of notes").await?;

        let loader = PlainTextLoader::new("txt");
        let pages = loader.load(&path).await?;

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page_number, 1);
        assert_eq!(pages[0].text, "a single page of notes");
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_is_load_error() {
        let loader = PlainTextLoader::new("txt");
        let result = loader.load(Path::new("/nonexistent/file.txt")).await;

        match result {
            Err(SyncError::Load { source_id, .. }) => {
                assert!(source_id.contains("file.txt"));
            }
            other => panic!("expected Load error, got {other:?}"),
        }
    }

    #[test]
    fn test_loader_for_extension() {
        assert_eq!(loader_for_extension("pdf").extension(), "pdf");
        assert_eq!(loader_for_extension("PDF").extension(), "pdf");
        assert_eq!(loader_for_extension("txt").extension(), "txt");
    }
}
