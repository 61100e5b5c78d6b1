use async_trait::async_trait;
use std::path::Path;

use crate::domain::{errors::DomainError, ExtractedText};

#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Extracts the text of every page of the document at `path`.
    async fn load(&self, path: &Path) -> Result<ExtractedText, DomainError>;
}
