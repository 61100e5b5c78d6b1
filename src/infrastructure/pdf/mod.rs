use async_trait::async_trait;
use std::path::Path;
use tracing::instrument;

use crate::domain::{ports::DocumentLoader, DomainError, ExtractedText};

/// PDF header must appear within the first KiB of the file.
const HEADER_WINDOW: usize = 1024;

/// Extracts page text with `pdf-extract` on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfLoader;

impl PdfLoader {
    pub fn new() -> Self {
        Self
    }
}

fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_WINDOW)];
    window.windows(5).any(|w| w == b"%PDF-")
}

#[async_trait]
impl DocumentLoader for PdfLoader {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn load(&self, path: &Path) -> Result<ExtractedText, DomainError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| DomainError::io(format!("Failed to read {name}: {e}")))?;

        if bytes.is_empty() {
            return Err(DomainError::invalid_document(format!("{name} is empty")));
        }
        if !has_pdf_header(&bytes) {
            return Err(DomainError::invalid_document(format!(
                "{name} is not a PDF file"
            )));
        }

        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        })
        .await
        .map_err(|e| DomainError::invalid_document(format!("PDF parser failed on {name}: {e}")))?
        .map_err(|e| DomainError::invalid_document(format!("Failed to parse {name}: {e}")))?;

        tracing::debug!(pages = pages.len(), "pdf text extracted");
        Ok(ExtractedText::new(pages))
    }
}
