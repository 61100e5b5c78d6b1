use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::DomainError;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const WATSONX_API_KEY: &str = "WATSONX_API_KEY";
pub const WATSONX_PROJECT_ID: &str = "WATSONX_PROJECT_ID";
pub const WATSONX_URL: &str = "WATSONX_URL";

/// Hosted model family used for answers, summaries and extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelProvider {
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "watsonx")]
    Watsonx,
}

impl ModelProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Watsonx => "watsonx",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Watsonx => "WatsonX",
        }
    }
}

impl fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelProvider {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "watsonx" => Ok(Self::Watsonx),
            other => Err(DomainError::validation(format!(
                "Invalid model provider: {other}. Choose 'openai' or 'watsonx'."
            ))),
        }
    }
}

/// API keys and project identifiers for the hosted model providers.
///
/// Blank values count as absent. `Debug` never prints secrets.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub watsonx_api_key: Option<String>,
    pub watsonx_project_id: Option<String>,
    pub watsonx_url: Option<String>,
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Credentials {
    /// Builds credentials from a `KEY -> value` lookup, typically the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            openai_api_key: normalize(lookup(OPENAI_API_KEY)),
            watsonx_api_key: normalize(lookup(WATSONX_API_KEY)),
            watsonx_project_id: normalize(lookup(WATSONX_PROJECT_ID)),
            watsonx_url: normalize(lookup(WATSONX_URL)),
        }
    }

    /// Names of the variables still missing for `provider`.
    pub fn missing(&self, provider: ModelProvider) -> Vec<&'static str> {
        match provider {
            ModelProvider::OpenAi => {
                if present(&self.openai_api_key) {
                    vec![]
                } else {
                    vec![OPENAI_API_KEY]
                }
            }
            ModelProvider::Watsonx => {
                let mut missing = Vec::new();
                if !present(&self.watsonx_api_key) {
                    missing.push(WATSONX_API_KEY);
                }
                if !present(&self.watsonx_project_id) {
                    missing.push(WATSONX_PROJECT_ID);
                }
                missing
            }
        }
    }

    pub fn has(&self, provider: ModelProvider) -> bool {
        self.missing(provider).is_empty()
    }

    pub fn require(&self, provider: ModelProvider) -> Result<(), DomainError> {
        let missing = self.missing(provider);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DomainError::missing_credentials(format!(
                "{} credentials not found. Set {}.",
                provider.display_name(),
                missing.join(" and ")
            )))
        }
    }

    /// Stores credentials entered by the user for `provider`.
    ///
    /// WatsonX needs both the key and the project id; nothing is changed
    /// when either is missing.
    pub fn set(
        &mut self,
        provider: ModelProvider,
        api_key: Option<String>,
        project_id: Option<String>,
        url: Option<String>,
    ) -> Result<(), DomainError> {
        let api_key = normalize(api_key)
            .ok_or_else(|| DomainError::validation("api_key must not be empty"))?;

        match provider {
            ModelProvider::OpenAi => {
                self.openai_api_key = Some(api_key);
            }
            ModelProvider::Watsonx => {
                let project_id = normalize(project_id).ok_or_else(|| {
                    DomainError::validation("project_id is required for WatsonX")
                })?;
                self.watsonx_api_key = Some(api_key);
                self.watsonx_project_id = Some(project_id);
                if let Some(url) = normalize(url) {
                    self.watsonx_url = Some(url);
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn mask(value: &Option<String>) -> &'static str {
            if present(value) {
                "<redacted>"
            } else {
                "<unset>"
            }
        }

        f.debug_struct("Credentials")
            .field("openai_api_key", &mask(&self.openai_api_key))
            .field("watsonx_api_key", &mask(&self.watsonx_api_key))
            .field("watsonx_project_id", &self.watsonx_project_id)
            .field("watsonx_url", &self.watsonx_url)
            .finish()
    }
}
