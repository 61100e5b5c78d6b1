use std::sync::Arc;
use tracing::instrument;

use crate::domain::{
    chunk_pages,
    ports::{DocumentLoader, FileStore},
    Document, DocumentChunk, DomainError, ExtractedText, RecursiveSplitter,
};

/// Stores uploaded PDFs and turns them into page text and chunks.
pub struct DocumentService {
    files: Arc<dyn FileStore>,
    loader: Arc<dyn DocumentLoader>,
    splitter: RecursiveSplitter,
}

impl DocumentService {
    pub fn new(
        files: Arc<dyn FileStore>,
        loader: Arc<dyn DocumentLoader>,
        splitter: RecursiveSplitter,
    ) -> Self {
        Self {
            files,
            loader,
            splitter,
        }
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn store_upload(&self, filename: &str, bytes: &[u8]) -> Result<Document, DomainError> {
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(DomainError::validation("file name must not be empty"));
        }
        if !filename.to_ascii_lowercase().ends_with(".pdf") {
            return Err(DomainError::validation(format!(
                "Only PDF files are accepted, got {filename}"
            )));
        }

        let path = self.files.save(filename, bytes).await?;
        Ok(Document::new(filename, path, bytes.len() as u64))
    }

    #[instrument(skip(self, document), fields(document = %document.filename))]
    pub async fn discard(&self, document: &Document) -> Result<(), DomainError> {
        self.files.remove(&document.path).await
    }

    /// Extracts page text, failing when the document has no text at all.
    #[instrument(skip(self, document), fields(document = %document.filename))]
    pub async fn extract(&self, document: &Document) -> Result<ExtractedText, DomainError> {
        let text = self.loader.load(&document.path).await?;
        if text.is_blank() {
            return Err(DomainError::empty_document(format!(
                "No text could be extracted from {}",
                document.filename
            )));
        }
        Ok(text)
    }

    pub fn chunk(&self, document: &Document, text: &ExtractedText) -> Vec<DocumentChunk> {
        chunk_pages(document.id, &text.pages, &self.splitter)
    }
}
