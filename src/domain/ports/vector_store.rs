use crate::domain::{errors::DomainError, DocumentChunk, Embedding, SearchResult};
use async_trait::async_trait;

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, chunk: &DocumentChunk, embedding: &Embedding)
        -> Result<(), DomainError>;

    async fn upsert_batch(
        &self,
        chunks: &[DocumentChunk],
        embeddings: &[Embedding],
    ) -> Result<(), DomainError> {
        if chunks.len() != embeddings.len() {
            return Err(DomainError::internal(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            self.upsert(chunk, embedding).await?;
        }
        Ok(())
    }

    async fn search(
        &self,
        query: &Embedding,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError>;

    /// Drops every stored chunk.
    async fn clear(&self) -> Result<(), DomainError>;

    async fn len(&self) -> Result<usize, DomainError>;

    async fn is_empty(&self) -> Result<bool, DomainError> {
        Ok(self.len().await? == 0)
    }

    /// Releases backend resources when the session ends.
    async fn teardown(&self) -> Result<(), DomainError> {
        self.clear().await
    }

    fn backend(&self) -> &'static str;
}
