use crate::domain::{errors::DomainError, Credentials, ModelProvider};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait LlmService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, DomainError>;
    async fn complete_with_system(&self, system: &str, prompt: &str)
        -> Result<String, DomainError>;
    fn model_name(&self) -> &str;
}

/// Builds a client for the selected provider from the session credentials.
pub trait LlmFactory: Send + Sync {
    fn create(
        &self,
        provider: ModelProvider,
        credentials: &Credentials,
    ) -> Result<Arc<dyn LlmService>, DomainError>;
}
