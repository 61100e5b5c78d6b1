use std::sync::Arc;

use crate::application::{DocumentService, RagService, Session};
use crate::domain::{
    ports::{EmbeddingService, VectorStore},
    Credentials, DomainError, RecursiveSplitter, StatusLog,
};
use crate::infrastructure::config::{EmbeddingProvider, VectorBackend};
use crate::infrastructure::{
    AppConfig, HostedLlmFactory, InMemoryVectorStore, LocalFileStore, PdfLoader,
    QdrantVectorStore, TextEmbedding,
};

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Session>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(session: Arc<Session>, config: Arc<AppConfig>) -> Self {
        Self { session, config }
    }

    /// Wires the production adapters from configuration.
    pub async fn from_config(
        config: AppConfig,
        credentials: Credentials,
    ) -> Result<Self, DomainError> {
        let cfg = &config.config;

        let embedding = build_embedding(&config)?;
        let vector_store = build_vector_store(&config, embedding.dimension()).await?;

        let documents = Arc::new(DocumentService::new(
            Arc::new(LocalFileStore::new(cfg.uploads.dir.clone())),
            Arc::new(PdfLoader::new()),
            RecursiveSplitter::new(cfg.rag.chunk_size, cfg.rag.chunk_overlap),
        ));
        let rag = Arc::new(
            RagService::new(embedding, vector_store, cfg.rag.top_k)
                .with_batch_size(cfg.embedding.batch_size),
        );
        let llm_factory = Arc::new(HostedLlmFactory::new(cfg.llm.clone()));

        let session = Session::new(documents, rag, llm_factory, config.prompts.clone())
            .with_provider(cfg.llm.provider)
            .with_credentials(credentials)
            .with_status_log(Arc::new(StatusLog::new(cfg.status.max_entries)));

        tracing::info!(
            session = %session.id(),
            provider = %cfg.llm.provider,
            vector_backend = session.vector_backend(),
            "session initialized"
        );

        Ok(Self::new(Arc::new(session), Arc::new(config)))
    }
}

fn build_embedding(config: &AppConfig) -> Result<Arc<dyn EmbeddingService>, DomainError> {
    let embedding = &config.config.embedding;
    match embedding.provider {
        EmbeddingProvider::OpenAi => Ok(Arc::new(TextEmbedding::from_config(embedding))),
        #[cfg(feature = "local-embeddings")]
        EmbeddingProvider::Local => Ok(Arc::new(
            crate::infrastructure::LocalEmbedding::from_config(embedding)?,
        )),
        #[cfg(not(feature = "local-embeddings"))]
        EmbeddingProvider::Local => Err(DomainError::validation(
            "embedding.provider 'local' requires building with the local-embeddings feature",
        )),
    }
}

async fn build_vector_store(
    config: &AppConfig,
    dimension: usize,
) -> Result<Arc<dyn VectorStore>, DomainError> {
    let store = &config.config.vector_store;
    match store.backend {
        VectorBackend::Memory => Ok(Arc::new(InMemoryVectorStore::new())),
        VectorBackend::Qdrant => {
            let collection = format!(
                "{}_{}",
                store.collection_prefix,
                uuid::Uuid::new_v4().simple()
            );
            Ok(Arc::new(
                QdrantVectorStore::new(&store.qdrant_url, &collection, dimension).await?,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ModelProvider;
    use crate::testing::{embeddings_router, pdf_bytes, serve, temp_dir, SeenKeys};

    async fn config_against(keys: SeenKeys) -> AppConfig {
        let base_url = serve(embeddings_router(keys)).await;
        let mut config = AppConfig::default();
        config.config.embedding.base_url = format!("{base_url}/v1");
        config.config.embedding.dimension = 2;
        config.config.uploads.dir = temp_dir();
        config
    }

    #[tokio::test]
    async fn test_session_entered_key_reaches_embeddings() {
        let keys = SeenKeys::default();
        let state = AppState::from_config(config_against(keys.clone()).await, Credentials::default())
            .await
            .unwrap();
        let session = &state.session;

        session.set_provider(ModelProvider::Watsonx).await;
        session
            .set_credentials(
                ModelProvider::Watsonx,
                Some("ibm-key".into()),
                Some("proj".into()),
                None,
            )
            .await
            .unwrap();
        session
            .upload("one.pdf", &pdf_bytes(&["The capital of France is Paris."]))
            .await
            .unwrap();

        let snapshot = session.snapshot().await.unwrap();
        assert!(snapshot.credentials.watsonx);
        assert!(!snapshot.credentials.embeddings);

        let err = session.process().await.unwrap_err();
        assert!(matches!(err, DomainError::MissingCredentials(ref m) if m.contains("OPENAI_API_KEY")));
        assert!(keys.lock().unwrap().is_empty());

        session
            .set_credentials(ModelProvider::OpenAi, Some("sk-session".into()), None, None)
            .await
            .unwrap();
        assert!(session.snapshot().await.unwrap().credentials.embeddings);

        let report = session.process().await.unwrap();
        assert_eq!(report.chunks, 1);
        assert_eq!(session.indexed_chunks().await.unwrap(), 1);

        let seen = keys.lock().unwrap().clone();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|k| k == "sk-session"));
    }

    #[tokio::test]
    async fn test_environment_key_reaches_embeddings() {
        let keys = SeenKeys::default();
        let credentials = Credentials {
            openai_api_key: Some("sk-env".into()),
            ..Credentials::default()
        };
        let state = AppState::from_config(config_against(keys.clone()).await, credentials)
            .await
            .unwrap();

        state
            .session
            .upload("one.pdf", &pdf_bytes(&["Rust has no garbage collector."]))
            .await
            .unwrap();
        state.session.process().await.unwrap();

        assert_eq!(*keys.lock().unwrap(), vec!["sk-env".to_string()]);
    }
}
