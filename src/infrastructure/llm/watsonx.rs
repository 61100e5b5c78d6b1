use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;

use super::{check_status, transport_error};
use crate::domain::{ports::LlmService, DomainError};
use crate::infrastructure::config::WatsonxConfig;

const PROVIDER: &str = "WatsonX";
const IAM_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";
/// Refresh the bearer token this many seconds before IBM says it expires.
const TOKEN_REFRESH_MARGIN: i64 = 60;

/// IBM watsonx.ai text generation client.
///
/// Exchanges the API key for an IAM bearer token and caches it until shortly
/// before expiry.
pub struct WatsonxLlm {
    client: reqwest::Client,
    api_key: String,
    project_id: String,
    url: String,
    config: WatsonxConfig,
    token: Mutex<Option<IamToken>>,
}

#[derive(Debug, Clone)]
struct IamToken {
    access_token: String,
    expires_at: i64,
}

#[derive(Debug, Deserialize)]
struct IamTokenResponse {
    access_token: String,
    expiration: i64,
}

#[derive(Debug, Serialize)]
struct GenerationParameters<'a> {
    decoding_method: &'a str,
    max_new_tokens: u32,
    min_new_tokens: u32,
    temperature: f32,
    top_k: u32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    input: &'a str,
    model_id: &'a str,
    project_id: &'a str,
    parameters: GenerationParameters<'a>,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    results: Vec<GenerationResult>,
}

#[derive(Debug, Deserialize)]
struct GenerationResult {
    generated_text: String,
}

impl WatsonxLlm {
    pub fn new(
        api_key: impl Into<String>,
        project_id: impl Into<String>,
        url: impl Into<String>,
        config: WatsonxConfig,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            project_id: project_id.into(),
            url: url.into(),
            config,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, DomainError> {
        let mut cached = self.token.lock().await;
        let now = Utc::now().timestamp();

        if let Some(token) = cached.as_ref() {
            if token.expires_at - TOKEN_REFRESH_MARGIN > now {
                return Ok(token.access_token.clone());
            }
        }

        let response = self
            .client
            .post(&self.config.iam_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("grant_type", IAM_GRANT_TYPE), ("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| transport_error("IBM IAM", e))?;

        // IAM answers an unknown key with 400
        if response.status().is_client_error() {
            let status = response.status();
            return Err(DomainError::authentication(format!(
                "IBM IAM rejected the {PROVIDER} API key ({status})"
            )));
        }

        let token: IamTokenResponse = check_status("IBM IAM", response)
            .await?
            .json()
            .await
            .map_err(|e| DomainError::external(format!("Invalid IAM response: {e}")))?;

        tracing::debug!(expires_at = token.expiration, "watsonx iam token refreshed");
        *cached = Some(IamToken {
            access_token: token.access_token.clone(),
            expires_at: token.expiration,
        });
        Ok(token.access_token)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/ml/v1/text/generation?version={}",
            self.url.trim_end_matches('/'),
            self.config.api_version
        )
    }

    async fn generate(&self, input: &str) -> Result<String, DomainError> {
        let token = self.access_token().await?;

        let request = GenerationRequest {
            input,
            model_id: &self.config.model,
            project_id: &self.project_id,
            parameters: GenerationParameters {
                decoding_method: &self.config.decoding_method,
                max_new_tokens: self.config.max_new_tokens,
                min_new_tokens: self.config.min_new_tokens,
                temperature: self.config.temperature,
                top_k: self.config.top_k,
                top_p: self.config.top_p,
            },
        };

        tracing::debug!(model = %self.config.model, input_chars = input.len(), "watsonx generation");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let response: GenerationResponse = check_status(PROVIDER, response)
            .await?
            .json()
            .await
            .map_err(|e| DomainError::external(format!("Invalid {PROVIDER} response: {e}")))?;

        response
            .results
            .into_iter()
            .next()
            .map(|r| r.generated_text.trim().to_string())
            .ok_or_else(|| DomainError::external(format!("{PROVIDER} returned no results")))
    }
}

#[async_trait]
impl LlmService for WatsonxLlm {
    async fn complete(&self, prompt: &str) -> Result<String, DomainError> {
        self.generate(prompt).await
    }

    // Text generation has no system role; the instructions lead the input.
    async fn complete_with_system(&self, system: &str, prompt: &str) -> Result<String, DomainError> {
        self.generate(&format!("{system}\n\n{prompt}")).await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
