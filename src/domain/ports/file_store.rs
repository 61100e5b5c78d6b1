use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::domain::errors::DomainError;

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, DomainError>;
    async fn remove(&self, path: &Path) -> Result<(), DomainError>;
}
