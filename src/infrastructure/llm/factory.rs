use std::sync::Arc;
use std::time::Duration;

use super::{OpenAiLlm, WatsonxLlm};
use crate::domain::{
    ports::{LlmFactory, LlmService},
    Credentials, DomainError, ModelProvider,
};
use crate::infrastructure::config::LlmConfig;

/// Builds hosted model clients from the configured model settings.
pub struct HostedLlmFactory {
    config: LlmConfig,
}

impl HostedLlmFactory {
    pub fn new(config: LlmConfig) -> Self {
        Self { config }
    }
}

impl LlmFactory for HostedLlmFactory {
    fn create(
        &self,
        provider: ModelProvider,
        credentials: &Credentials,
    ) -> Result<Arc<dyn LlmService>, DomainError> {
        credentials.require(provider)?;
        let timeout = Duration::from_secs(self.config.timeout_seconds);

        let llm: Arc<dyn LlmService> = match provider {
            ModelProvider::OpenAi => Arc::new(OpenAiLlm::new(
                credentials.openai_api_key.clone().unwrap_or_default(),
                self.config.openai.clone(),
                timeout,
            )?),
            ModelProvider::Watsonx => Arc::new(WatsonxLlm::new(
                credentials.watsonx_api_key.clone().unwrap_or_default(),
                credentials.watsonx_project_id.clone().unwrap_or_default(),
                credentials
                    .watsonx_url
                    .clone()
                    .unwrap_or_else(|| self.config.watsonx.url.clone()),
                self.config.watsonx.clone(),
                timeout,
            )?),
        };

        tracing::info!(provider = %provider, model = llm.model_name(), "llm client created");
        Ok(llm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials() {
        let factory = HostedLlmFactory::new(LlmConfig::default());
        let result = factory.create(ModelProvider::Watsonx, &Credentials::default());
        assert!(matches!(result, Err(DomainError::MissingCredentials(_))));
    }

    #[test]
    fn test_creates_configured_models() {
        let factory = HostedLlmFactory::new(LlmConfig::default());
        let credentials = Credentials {
            openai_api_key: Some("sk-test".into()),
            watsonx_api_key: Some("ibm-key".into()),
            watsonx_project_id: Some("proj".into()),
            watsonx_url: None,
        };

        let openai = factory.create(ModelProvider::OpenAi, &credentials).unwrap();
        assert_eq!(openai.model_name(), "gpt-4o");

        let watsonx = factory.create(ModelProvider::Watsonx, &credentials).unwrap();
        assert_eq!(watsonx.model_name(), "mistralai/mistral-large");
    }
}
