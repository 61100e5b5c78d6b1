use crate::domain::{errors::DomainError, Credentials, Embedding};
use async_trait::async_trait;

#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError>;
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError>;
    fn dimension(&self) -> usize;
    fn model_name(&self) -> &str;

    /// Picks up keys entered for the session. Local models ignore them.
    fn use_credentials(&self, _credentials: &Credentials) {}

    /// Credential variables the model still needs before it can be called.
    fn missing_credentials(&self) -> Vec<&'static str> {
        Vec::new()
    }
}
