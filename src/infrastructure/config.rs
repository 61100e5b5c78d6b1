use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::{Credentials, ModelProvider};

pub const DEFAULT_CONFIG_PATH: &str = "config/app.yaml";
pub const DEFAULT_PROMPTS_PATH: &str = "config/prompts.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Settings plus prompt templates, each loaded from its own YAML file.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub config: Config,
    pub prompts: PromptsConfig,
}

impl AppConfig {
    /// Loads from `APP_CONFIG` / `PROMPTS_CONFIG` (or the default paths),
    /// applies environment overrides and validates the result.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("APP_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let prompts_path =
            std::env::var("PROMPTS_CONFIG").unwrap_or_else(|_| DEFAULT_PROMPTS_PATH.into());

        let mut app = Self::load_from(Path::new(&config_path), Path::new(&prompts_path))?;
        app.config.apply_overrides(|key| std::env::var(key).ok())?;
        app.validate()?;
        Ok(app)
    }

    /// Missing files fall back to the built-in defaults.
    pub fn load_from(config_path: &Path, prompts_path: &Path) -> Result<Self, ConfigError> {
        Ok(Self {
            config: read_yaml(config_path)?.unwrap_or_default(),
            prompts: read_yaml(prompts_path)?.unwrap_or_default(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let rag = &self.config.rag;
        if rag.chunk_size == 0 {
            return Err(ConfigError::Invalid("rag.chunk_size must be > 0".into()));
        }
        if rag.chunk_overlap >= rag.chunk_size {
            return Err(ConfigError::Invalid(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                rag.chunk_overlap, rag.chunk_size
            )));
        }
        if rag.top_k == 0 {
            return Err(ConfigError::Invalid("rag.top_k must be > 0".into()));
        }
        if self.config.embedding.batch_size == 0 {
            return Err(ConfigError::Invalid("embedding.batch_size must be > 0".into()));
        }
        if self.config.embedding.dimension == 0 {
            return Err(ConfigError::Invalid("embedding.dimension must be > 0".into()));
        }
        Ok(())
    }
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(None);
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_yaml::from_str(&raw)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Reads provider credentials from the process environment.
pub fn load_credentials() -> Credentials {
    Credentials::from_lookup(|key| std::env::var(key).ok())
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub rag: RagConfig,
    pub vector_store: VectorStoreConfig,
    pub uploads: UploadsConfig,
    pub status: StatusConfig,
}

impl Config {
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("SERVER_PORT is not a port: {port}")))?;
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.llm.openai.base_url = url.clone();
            self.embedding.base_url = url;
        }
        if let Some(url) = lookup("QDRANT_URL") {
            self.vector_store.qdrant_url = url;
        }
        if let Some(dir) = lookup("UPLOAD_DIR") {
            self.uploads.dir = PathBuf::from(dir);
        }
        if let Some(provider) = lookup("MODEL_PROVIDER") {
            self.llm.provider = provider
                .parse()
                .map_err(|e: crate::domain::DomainError| ConfigError::Invalid(e.to_string()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: ModelProvider,
    pub timeout_seconds: u64,
    pub openai: OpenAiConfig,
    pub watsonx: WatsonxConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ModelProvider::OpenAi,
            timeout_seconds: 120,
            openai: OpenAiConfig::default(),
            watsonx: WatsonxConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: 0.0,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatsonxConfig {
    pub model: String,
    pub url: String,
    pub iam_url: String,
    pub api_version: String,
    pub decoding_method: String,
    pub max_new_tokens: u32,
    pub min_new_tokens: u32,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
}

impl Default for WatsonxConfig {
    fn default() -> Self {
        Self {
            model: "mistralai/mistral-large".to_string(),
            url: "https://us-south.ml.cloud.ibm.com".to_string(),
            iam_url: "https://iam.cloud.ibm.com/identity/token".to_string(),
            api_version: "2023-05-29".to_string(),
            decoding_method: "greedy".to_string(),
            max_new_tokens: 13000,
            min_new_tokens: 1,
            temperature: 0.0,
            top_k: 50,
            top_p: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    OpenAi,
    Local,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub model: String,
    pub dimension: usize,
    pub batch_size: usize,
    /// OpenAI-compatible endpoint used by the `openai` provider.
    pub base_url: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::OpenAi,
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
            batch_size: 64,
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RagConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    #[default]
    Memory,
    Qdrant,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    pub backend: VectorBackend,
    pub qdrant_url: String,
    pub collection_prefix: String,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::Memory,
            qdrant_url: "http://localhost:6334".to_string(),
            collection_prefix: "pdf_analyzer".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadsConfig {
    pub dir: PathBuf,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("uploads"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StatusConfig {
    pub max_entries: usize,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self { max_entries: 500 }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub answer: AnswerPrompts,
    pub summary: SummaryPrompts,
    pub extraction: ExtractionPrompts,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnswerPrompts {
    pub system: String,
    pub template: String,
}

impl Default for AnswerPrompts {
    fn default() -> Self {
        Self {
            system: "You answer questions about a PDF document using only the excerpts you are given."
                .to_string(),
            template: "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n\
{context}\n\nQuestion: {question}\nHelpful Answer:"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SummaryPrompts {
    pub query: String,
    pub template: String,
    pub top_k: usize,
}

impl Default for SummaryPrompts {
    fn default() -> Self {
        Self {
            query: "Summarize this document in 3-5 paragraphs, highlighting the key points and main topics covered."
                .to_string(),
            template: "Context: {context}\n\nBased only on the provided context, {query}".to_string(),
            top_k: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractionPrompts {
    pub template: String,
    pub marker_field: String,
    pub example_marker: String,
}

impl Default for ExtractionPrompts {
    fn default() -> Self {
        Self {
            template: r#"<instruction>
Extract every resolution mentioned in the following text. Do not invent or infer any
information that is not present in the text.

For each resolution extract only:
- number: only if explicitly mentioned
- date: only if explicitly mentioned
- description: only if explicitly mentioned
- page: only if explicitly mentioned

Format the output as a JSON array of objects with the fields "number", "date",
"description" and "page". Only emit an object when "number" has a value. Do not add
any explanation or comment.

Example output, not to be included in the answer:
[
  {"number": "123", "date": "2023-01-01", "description": "Example budget approval", "page": "5"}
]
</instruction>
<text>
{text}
</text>"#
                .to_string(),
            marker_field: "description".to_string(),
            example_marker: "Example".to_string(),
        }
    }
}

/// Replaces each `{key}` placeholder in `template`.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |text, (key, value)| {
        text.replace(&format!("{{{key}}}"), value)
    })
}

impl PromptsConfig {
    pub fn answer_prompt(&self, context: &str, question: &str) -> String {
        render_template(
            &self.answer.template,
            &[("context", context), ("question", question)],
        )
    }

    pub fn summary_prompt(&self, context: &str) -> String {
        render_template(
            &self.summary.template,
            &[("context", context), ("query", &self.summary.query)],
        )
    }

    pub fn extraction_prompt(&self, text: &str) -> String {
        render_template(&self.extraction.template, &[("text", text)])
    }
}
