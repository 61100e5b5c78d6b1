use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions};
use std::sync::{Arc, Mutex};

use crate::domain::{ports::EmbeddingService, DomainError, Embedding};
use crate::infrastructure::config::EmbeddingConfig;

/// On-device sentence embeddings via fastembed (ONNX runtime).
///
/// The model is downloaded on first use.
pub struct LocalEmbedding {
    model: Arc<Mutex<fastembed::TextEmbedding>>,
    name: String,
    dimension: usize,
}

fn resolve_model(name: &str) -> Option<(EmbeddingModel, usize)> {
    match name {
        "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
            Some((EmbeddingModel::AllMiniLML6V2, 384))
        }
        "bge-small-en-v1.5" | "BAAI/bge-small-en-v1.5" => Some((EmbeddingModel::BGESmallENV15, 384)),
        "bge-base-en-v1.5" | "BAAI/bge-base-en-v1.5" => Some((EmbeddingModel::BGEBaseENV15, 768)),
        _ => None,
    }
}

impl LocalEmbedding {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, DomainError> {
        let (model, dimension) = resolve_model(&config.model).ok_or_else(|| {
            DomainError::validation(format!("unsupported local embedding model: {}", config.model))
        })?;

        let opts = InitOptions::new(model).with_show_download_progress(false);
        let model = fastembed::TextEmbedding::try_new(opts)
            .map_err(|e| DomainError::external(format!("failed to load {}: {e}", config.model)))?;

        tracing::info!(model = %config.model, dimension, "local embedding model loaded");

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            name: config.model.clone(),
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingService for LocalEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::internal("No embedding returned"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let texts: Vec<String> = texts.iter().map(|t| t.to_string()).collect();

        let vectors = tokio::task::spawn_blocking(move || {
            let mut model = model.lock().unwrap_or_else(|e| e.into_inner());
            model.embed(texts, None)
        })
        .await
        .map_err(|e| DomainError::internal(format!("embedding task failed: {e}")))?
        .map_err(|e| DomainError::external(e.to_string()))?;

        Ok(vectors.into_iter().map(Embedding::new).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}
