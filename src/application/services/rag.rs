use std::sync::Arc;
use tracing::instrument;

use crate::domain::{
    ports::{EmbeddingService, VectorStore},
    Credentials, DocumentChunk, DomainError, SearchResult,
};

/// Embeds chunks into the vector index and retrieves the closest ones.
pub struct RagService {
    embedding: Arc<dyn EmbeddingService>,
    vector_store: Arc<dyn VectorStore>,
    default_top_k: usize,
    batch_size: usize,
}

impl RagService {
    pub fn new(
        embedding: Arc<dyn EmbeddingService>,
        vector_store: Arc<dyn VectorStore>,
        default_top_k: usize,
    ) -> Self {
        Self {
            embedding,
            vector_store,
            default_top_k: default_top_k.max(1),
            batch_size: 64,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    pub fn embedding_model(&self) -> &str {
        self.embedding.model_name()
    }

    pub fn backend(&self) -> &'static str {
        self.vector_store.backend()
    }

    pub fn use_credentials(&self, credentials: &Credentials) {
        self.embedding.use_credentials(credentials);
    }

    /// Credential variables the embedding model still needs.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        self.embedding.missing_credentials()
    }

    #[instrument(skip(self))]
    pub async fn retrieve(&self, query: &str) -> Result<Vec<SearchResult>, DomainError> {
        self.retrieve_top_k(query, self.default_top_k).await
    }

    #[instrument(skip(self))]
    pub async fn retrieve_top_k(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        if top_k == 0 {
            return Err(DomainError::validation("top_k must be at least 1"));
        }
        if self.vector_store.is_empty().await? {
            return Ok(Vec::new());
        }

        let embedding = self.embedding.embed(query).await?;
        self.vector_store.search(&embedding, top_k).await
    }

    /// Embeds `chunks` in batches, calling `on_progress(done, total)` after
    /// each batch is stored.
    #[instrument(skip(self, chunks, on_progress), fields(count = chunks.len()))]
    pub async fn index_chunks<F>(
        &self,
        chunks: &[DocumentChunk],
        on_progress: F,
    ) -> Result<usize, DomainError>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let total = chunks.len();
        let mut done = 0;

        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();
            let embeddings = self.embedding.embed_batch(&texts).await?;
            self.vector_store.upsert_batch(batch, &embeddings).await?;

            done += batch.len();
            on_progress(done, total);
        }

        Ok(done)
    }

    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), DomainError> {
        self.vector_store.clear().await
    }

    pub async fn len(&self) -> Result<usize, DomainError> {
        self.vector_store.len().await
    }

    pub async fn is_empty(&self) -> Result<bool, DomainError> {
        self.vector_store.is_empty().await
    }

    pub async fn teardown(&self) -> Result<(), DomainError> {
        self.vector_store.teardown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Embedding;
    use crate::infrastructure::config::EmbeddingConfig;
    use crate::infrastructure::{InMemoryVectorStore, TextEmbedding};
    use crate::testing::{embeddings_router, openai_credentials, serve, HashEmbedding, SeenKeys};
    use std::sync::Mutex;
    use uuid::Uuid;

    fn service(batch_size: usize) -> RagService {
        RagService::new(
            Arc::new(HashEmbedding::default()),
            Arc::new(InMemoryVectorStore::new()),
            2,
        )
        .with_batch_size(batch_size)
    }

    fn chunks(texts: &[&str]) -> Vec<DocumentChunk> {
        let doc_id = Uuid::new_v4();
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| DocumentChunk::new(doc_id, *t, i))
            .collect()
    }

    #[tokio::test]
    async fn test_chunks_keep_their_vectors_through_openai_embeddings() {
        let base_url = serve(embeddings_router(SeenKeys::default())).await;
        let embedding = TextEmbedding::from_config(&EmbeddingConfig {
            base_url: format!("{base_url}/v1"),
            dimension: 2,
            ..EmbeddingConfig::default()
        });
        embedding.use_credentials(&openai_credentials());
        let store = Arc::new(InMemoryVectorStore::new());
        let rag = RagService::new(Arc::new(embedding), store.clone(), 1).with_batch_size(16);

        let texts: Vec<String> = (0..12).map(|i| format!("chunk number {i}")).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        rag.index_chunks(&chunks(&refs), |_, _| {}).await.unwrap();

        // The mock embeds the i-th input of a request to [i, 1].
        for i in [0usize, 5, 11] {
            let hits = store
                .search(&Embedding::new(vec![i as f32, 1.0]), 1)
                .await
                .unwrap();
            assert_eq!(hits[0].chunk.chunk_index, i);
            assert_eq!(hits[0].chunk.content, format!("chunk number {i}"));
        }
    }

    #[tokio::test]
    async fn test_index_reports_progress_per_batch() {
        let rag = service(2);
        let progress = Mutex::new(Vec::new());

        let indexed = rag
            .index_chunks(&chunks(&["a", "b", "c", "d", "e"]), |done, total| {
                progress.lock().unwrap().push((done, total));
            })
            .await
            .unwrap();

        assert_eq!(indexed, 5);
        assert_eq!(rag.len().await.unwrap(), 5);
        assert_eq!(progress.into_inner().unwrap(), vec![(2, 5), (4, 5), (5, 5)]);
    }

    #[tokio::test]
    async fn test_retrieve_ranks_relevant_chunk_first() {
        let rag = service(64);
        rag.index_chunks(
            &chunks(&[
                "Bananas are yellow fruit",
                "The capital of France is Paris",
                "Rust has a borrow checker",
            ]),
            |_, _| {},
        )
        .await
        .unwrap();

        let results = rag.retrieve("What is the capital of France?").await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.content, "The capital of France is Paris");
    }

    #[tokio::test]
    async fn test_retrieve_on_empty_index() {
        let rag = service(64);
        assert!(rag.retrieve("anything").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_top_k_rejected() {
        let rag = service(64);
        let err = rag.retrieve_top_k("q", 0).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_clear_empties_index() {
        let rag = service(64);
        rag.index_chunks(&chunks(&["old one", "old two"]), |_, _| {})
            .await
            .unwrap();
        rag.clear().await.unwrap();

        assert!(rag.is_empty().await.unwrap());
        assert!(rag.retrieve("old").await.unwrap().is_empty());
    }
}
