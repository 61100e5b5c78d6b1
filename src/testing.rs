//! Test doubles shared by unit tests across the crate.

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::{routing::post, Json, Router};
use serde_json::{json, Value};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::domain::{
    ports::{DocumentLoader, EmbeddingService, LlmFactory, LlmService},
    Credentials, DomainError, Embedding, ExtractedText, ModelProvider,
};

/// Fresh directory under the system temp dir.
pub fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pdf-analyzer-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Bag-of-words embedding: each lowercase word is hashed into a bucket.
pub struct HashEmbedding {
    dimension: usize,
}

impl Default for HashEmbedding {
    fn default() -> Self {
        Self { dimension: 256 }
    }
}

impl HashEmbedding {
    fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() as usize) % self.dimension] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingService for HashEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        Ok(Embedding::new(self.vector(text)))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        Ok(texts.iter().map(|t| Embedding::new(self.vector(t))).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hash-bow"
    }
}

type Reply = Box<dyn Fn(&str) -> Result<String, DomainError> + Send + Sync>;

/// LLM whose replies come from a closure; every prompt is recorded.
pub struct ScriptedLlm {
    reply: Reply,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(
        reply: impl Fn(&str) -> Result<String, DomainError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            reply: Box::new(reply),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Answers with the sentence of the prompt that mentions the most
    /// question words, which is enough to "answer" from retrieved context.
    pub fn extractive() -> Self {
        Self::new(|prompt| {
            let question = prompt
                .rsplit("Question:")
                .next()
                .and_then(|q| q.lines().next())
                .unwrap_or_default()
                .to_lowercase();
            let words: Vec<&str> = question
                .split(|c: char| !c.is_alphanumeric())
                .filter(|w| w.len() > 3)
                .collect();

            let best = prompt
                .split(['.', '\n'])
                .filter(|s| !s.to_lowercase().contains("question"))
                .max_by_key(|s| {
                    let lower = s.to_lowercase();
                    words.iter().filter(|w| lower.contains(*w)).count()
                })
                .unwrap_or_default();
            Ok(best.trim().to_string())
        })
    }

    pub fn failing(error: impl Fn() -> DomainError + Send + Sync + 'static) -> Self {
        Self::new(move |_| Err(error()))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }

    fn respond(&self, prompt: &str) -> Result<String, DomainError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.reply)(prompt)
    }
}

#[async_trait]
impl LlmService for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> Result<String, DomainError> {
        self.respond(prompt)
    }

    async fn complete_with_system(&self, _system: &str, prompt: &str) -> Result<String, DomainError> {
        self.respond(prompt)
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Hands out one shared LLM once the provider's credentials are present.
pub struct StaticLlmFactory {
    llm: Arc<dyn LlmService>,
    created: AtomicUsize,
}

impl StaticLlmFactory {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        Self {
            llm,
            created: AtomicUsize::new(0),
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl LlmFactory for StaticLlmFactory {
    fn create(
        &self,
        provider: ModelProvider,
        credentials: &Credentials,
    ) -> Result<Arc<dyn LlmService>, DomainError> {
        credentials.require(provider)?;
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.llm))
    }
}

/// Reads the file as UTF-8 text; form feeds separate pages.
pub struct TextLoader;

#[async_trait]
impl DocumentLoader for TextLoader {
    async fn load(&self, path: &Path) -> Result<ExtractedText, DomainError> {
        let bytes = tokio::fs::read(path).await?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(ExtractedText::new(
            text.split('\x0c').map(str::to_string).collect(),
        ))
    }
}

pub fn openai_credentials() -> Credentials {
    Credentials {
        openai_api_key: Some("sk-test".to_string()),
        ..Credentials::default()
    }
}

/// Binds `router` to a free local port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub type SeenKeys = Arc<Mutex<Vec<String>>>;

/// OpenAI-style `/v1/embeddings`. The input at position `i` of a request
/// embeds to `[i, 1.0]`; each bearer token is recorded.
pub fn embeddings_router(keys: SeenKeys) -> Router {
    async fn embeddings(
        State(keys): State<SeenKeys>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .trim_start_matches("Bearer ")
            .to_string();
        keys.lock().unwrap().push(token);

        let inputs = body["input"].as_array().map_or(0, Vec::len);
        let data: Vec<Value> = (0..inputs)
            .map(|i| json!({"object": "embedding", "index": i, "embedding": [i as f64, 1.0]}))
            .collect();
        Json(json!({
            "object": "list",
            "data": data,
            "model": body["model"],
            "usage": {"prompt_tokens": inputs, "total_tokens": inputs}
        }))
    }

    Router::new()
        .route("/v1/embeddings", post(embeddings))
        .with_state(keys)
}

/// Builds a minimal PDF with one line of Helvetica text per page.
pub fn pdf_bytes(pages: &[&str]) -> Vec<u8> {
    let count = pages.len();
    let kids = (0..count)
        .map(|i| format!("{} 0 R", 4 + 2 * i))
        .collect::<Vec<_>>()
        .join(" ");

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{kids}] /Count {count} >>"),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    ];

    for (i, text) in pages.iter().enumerate() {
        let escaped = text
            .replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)");
        let stream = format!("BT /F1 12 Tf 72 720 Td ({escaped}) Tj ET");
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            5 + 2 * i
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{stream}\nendstream",
            stream.len()
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }

    let xref = out.len();
    let mut tail = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        tail.push_str(&format!("{offset:010} 00000 n \n"));
    }
    tail.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
        objects.len() + 1
    ));
    out.extend_from_slice(tail.as_bytes());
    out
}

/// Router state over in-memory adapters, plain-text loading and `llm`.
pub fn test_state(llm: ScriptedLlm) -> crate::api::AppState {
    use crate::application::{DocumentService, RagService, Session};
    use crate::domain::RecursiveSplitter;
    use crate::infrastructure::{AppConfig, InMemoryVectorStore, LocalFileStore, PromptsConfig};

    let documents = Arc::new(DocumentService::new(
        Arc::new(LocalFileStore::new(temp_dir())),
        Arc::new(TextLoader),
        RecursiveSplitter::default(),
    ));
    let rag = Arc::new(RagService::new(
        Arc::new(HashEmbedding::default()),
        Arc::new(InMemoryVectorStore::new()),
        4,
    ));
    let factory = Arc::new(StaticLlmFactory::new(Arc::new(llm)));
    let session = Session::new(documents, rag, factory, PromptsConfig::default())
        .with_credentials(openai_credentials());

    crate::api::AppState::new(Arc::new(session), Arc::new(AppConfig::default()))
}
