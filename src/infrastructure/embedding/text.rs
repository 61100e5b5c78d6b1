use async_trait::async_trait;
use rig::client::EmbeddingsClient;
use rig::embeddings::EmbeddingsBuilder;
use rig::providers::openai;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::{ports::EmbeddingService, Credentials, DomainError, Embedding, OPENAI_API_KEY};
use crate::infrastructure::config::EmbeddingConfig;

/// OpenAI embeddings through rig.
///
/// The key comes from the session credentials, which start out with
/// `OPENAI_API_KEY` from the environment.
pub struct TextEmbedding {
    model: String,
    dimension: usize,
    base_url: String,
    api_key: RwLock<Option<String>>,
}

impl TextEmbedding {
    pub fn new() -> Self {
        Self::from_config(&EmbeddingConfig::default())
    }

    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self {
            model: config.model.clone(),
            dimension: config.dimension,
            base_url: config.base_url.clone(),
            api_key: RwLock::new(None),
        }
    }

    fn client(&self) -> Result<openai::Client, DomainError> {
        let api_key = self
            .api_key
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| {
                DomainError::missing_credentials(format!(
                    "OpenAI embeddings need an API key. Enter an OpenAI key for this session or set {OPENAI_API_KEY}."
                ))
            })?;

        openai::Client::builder()
            .api_key(api_key)
            .base_url(&self.base_url)
            .build()
            .map_err(|e| DomainError::internal(format!("OpenAI client setup failed: {e}")))
    }
}

impl Default for TextEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingService for TextEmbedding {
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

        let client = self.client()?;
        let model = client.embedding_model(&self.model);

        let mut builder = EmbeddingsBuilder::new(model);
        for text in texts {
            builder = builder
                .document(text.to_string())
                .map_err(|e| DomainError::external(e.to_string()))?;
        }

        let embeddings = builder
            .build()
            .await
            .map_err(|e| DomainError::external(format!("OpenAI embedding request failed: {e}")))?;

        if embeddings.len() != texts.len() {
            return Err(DomainError::external(format!(
                "requested {} embeddings, received {}",
                texts.len(),
                embeddings.len()
            )));
        }

        // rig hands the pairs back in no particular order.
        let by_text: HashMap<String, Embedding> = embeddings
            .into_iter()
            .map(|(doc, emb)| (doc, Embedding::from(emb.first().vec)))
            .collect();

        texts
            .iter()
            .map(|text| {
                by_text
                    .get(*text)
                    .cloned()
                    .ok_or_else(|| DomainError::external("embedding response is missing a text"))
            })
            .collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn use_credentials(&self, credentials: &Credentials) {
        *self.api_key.write().unwrap_or_else(|e| e.into_inner()) =
            credentials.openai_api_key.clone();
    }

    fn missing_credentials(&self) -> Vec<&'static str> {
        let has_key = self
            .api_key
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some();
        if has_key {
            Vec::new()
        } else {
            vec![OPENAI_API_KEY]
        }
    }
}
