use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::openai;
use std::time::Duration;

use super::prompt_error;
use crate::domain::{ports::LlmService, DomainError};
use crate::infrastructure::config::OpenAiConfig;

const PROVIDER: &str = "OpenAI";

/// Chat completions for OpenAI and compatible endpoints, through a rig agent.
pub struct OpenAiLlm {
    client: openai::CompletionsClient,
    config: OpenAiConfig,
}

impl OpenAiLlm {
    pub fn new(
        api_key: impl Into<String>,
        config: OpenAiConfig,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let client = openai::CompletionsClient::<reqwest::Client>::builder()
            .api_key(api_key.into())
            .base_url(&config.base_url)
            .http_client(http)
            .build()
            .map_err(|e| DomainError::internal(format!("{PROVIDER} client setup failed: {e}")))?;

        Ok(Self { client, config })
    }

    async fn prompt(&self, system: Option<&str>, prompt: &str) -> Result<String, DomainError> {
        let mut agent = self
            .client
            .agent(&self.config.model)
            .temperature(f64::from(self.config.temperature));
        if let Some(system) = system {
            agent = agent.preamble(system);
        }
        if let Some(max_tokens) = self.config.max_tokens {
            agent = agent.max_tokens(u64::from(max_tokens));
        }

        tracing::debug!(model = %self.config.model, prompt_chars = prompt.len(), "openai completion");

        agent
            .build()
            .prompt(prompt)
            .await
            .map_err(|e| prompt_error(PROVIDER, e))
    }
}

#[async_trait]
impl LlmService for OpenAiLlm {
    async fn complete(&self, prompt: &str) -> Result<String, DomainError> {
        self.prompt(None, prompt).await
    }

    async fn complete_with_system(&self, system: &str, prompt: &str) -> Result<String, DomainError> {
        self.prompt(Some(system), prompt).await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::serve;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    fn client(base_url: String, timeout: Duration) -> OpenAiLlm {
        let config = OpenAiConfig {
            base_url: format!("{base_url}/v1"),
            ..OpenAiConfig::default()
        };
        OpenAiLlm::new("sk-test", config, timeout).unwrap()
    }

    /// Message content arrives either as a string or as text parts.
    fn text_of(content: &Value) -> String {
        match content {
            Value::String(text) => text.clone(),
            Value::Array(parts) => parts
                .iter()
                .filter_map(|part| part["text"].as_str())
                .collect(),
            _ => String::new(),
        }
    }

    fn completion(content: &str) -> Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000u64,
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 5, "total_tokens": 9}
        })
    }

    #[tokio::test]
    async fn test_completion_with_system_prompt() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["model"], "gpt-4o");
                assert_eq!(body["temperature"], 0.0);
                assert_eq!(body["messages"][0]["role"], "system");
                assert_eq!(text_of(&body["messages"][0]["content"]), "be brief");
                let question = text_of(&body["messages"][1]["content"]);
                Json(completion(&format!("echo: {question}")))
            }),
        );
        let llm = client(serve(router).await, Duration::from_secs(5));

        let answer = llm.complete_with_system("be brief", "capital?").await.unwrap();
        assert_eq!(answer, "echo: capital?");
    }

    #[tokio::test]
    async fn test_completion_without_system_prompt() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["messages"][0]["role"], "user");
                Json(completion("plain"))
            }),
        );
        let llm = client(serve(router).await, Duration::from_secs(5));

        assert_eq!(llm.complete("hello").await.unwrap(), "plain");
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_authentication() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::UNAUTHORIZED, "invalid api key") }),
        );
        let llm = client(serve(router).await, Duration::from_secs(5));

        let err = llm.complete("hello").await.unwrap_err();
        assert!(matches!(err, DomainError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_external() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let llm = client(serve(router).await, Duration::from_secs(5));

        let err = llm.complete("hello").await.unwrap_err();
        assert!(matches!(err, DomainError::ExternalService(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_slow_server_maps_to_timeout() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(completion("late"))
            }),
        );
        let llm = client(serve(router).await, Duration::from_millis(200));

        let err = llm.complete("hello").await.unwrap_err();
        assert!(matches!(err, DomainError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                Json(json!({
                    "id": "chatcmpl-1",
                    "object": "chat.completion",
                    "created": 1_700_000_000u64,
                    "model": "gpt-4o",
                    "choices": []
                }))
            }),
        );
        let llm = client(serve(router).await, Duration::from_secs(5));

        assert!(llm.complete("hello").await.is_err());
    }
}
