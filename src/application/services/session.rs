use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::instrument;
use uuid::Uuid;

use super::{AnswerService, DocumentService, ExtractionService, RagService, Summary};
use crate::domain::{
    ports::{LlmFactory, LlmService},
    Conversation, ConversationTurn, Credentials, Document, DomainError, ExtractionReport,
    ModelProvider, SearchResult, StatusLog, StatusSnapshot,
};
use crate::infrastructure::PromptsConfig;

struct ProcessedDocument {
    document_id: Uuid,
    pages: Vec<String>,
    chunk_count: usize,
}

struct SessionState {
    provider: ModelProvider,
    credentials: Credentials,
    llm: Option<Arc<dyn LlmService>>,
    document: Option<Document>,
    processed: Option<ProcessedDocument>,
    conversation: Conversation,
    extraction: Option<ExtractionReport>,
}

impl SessionState {
    /// Forgets everything derived from the current upload.
    fn clear_derived(&mut self) {
        self.processed = None;
        self.conversation = Conversation::new();
        self.extraction = None;
    }

    fn processed(&self) -> Result<&ProcessedDocument, DomainError> {
        self.processed.as_ref().ok_or(DomainError::NoDocumentProcessed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessReport {
    pub document: Document,
    pub pages: usize,
    pub characters: usize,
    pub chunks: usize,
    pub embedding_model: String,
    pub vector_backend: &'static str,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CredentialStatus {
    pub openai: bool,
    pub watsonx: bool,
    /// Whether the embedding model has what it needs to index a document.
    pub embeddings: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub provider: ModelProvider,
    pub model: Option<String>,
    pub credentials: CredentialStatus,
    pub document: Option<Document>,
    pub processed: bool,
    pub processed_document_id: Option<Uuid>,
    pub pages: usize,
    pub chunks: usize,
    pub indexed_chunks: usize,
    pub turns: usize,
    pub has_extraction: bool,
    pub embedding_model: String,
    pub vector_backend: &'static str,
}

/// The single analysis session: one uploaded PDF, its index, the
/// conversation about it and the selected model provider.
///
/// Operations are serialized by the state lock. The status log has its own
/// lock so it can be read while an operation runs.
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    documents: Arc<DocumentService>,
    rag: Arc<RagService>,
    answers: AnswerService,
    extraction: ExtractionService,
    llm_factory: Arc<dyn LlmFactory>,
    status: Arc<StatusLog>,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(
        documents: Arc<DocumentService>,
        rag: Arc<RagService>,
        llm_factory: Arc<dyn LlmFactory>,
        prompts: PromptsConfig,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            answers: AnswerService::new(Arc::clone(&rag), prompts.clone()),
            extraction: ExtractionService::new(prompts),
            documents,
            rag,
            llm_factory,
            status: Arc::new(StatusLog::default()),
            state: Mutex::new(SessionState {
                provider: ModelProvider::default(),
                credentials: Credentials::default(),
                llm: None,
                document: None,
                processed: None,
                conversation: Conversation::new(),
                extraction: None,
            }),
        }
    }

    pub fn with_provider(mut self, provider: ModelProvider) -> Self {
        self.state.get_mut().provider = provider;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.rag.use_credentials(&credentials);
        self.state.get_mut().credentials = credentials;
        self
    }

    pub fn with_status_log(mut self, status: Arc<StatusLog>) -> Self {
        self.status = status;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn ensure_llm(&self, state: &mut SessionState) -> Result<Arc<dyn LlmService>, DomainError> {
        if let Some(llm) = &state.llm {
            return Ok(Arc::clone(llm));
        }

        let name = state.provider.display_name();
        self.status.info(format!("Initializing {name} model..."));
        let llm = self
            .llm_factory
            .create(state.provider, &state.credentials)
            .inspect_err(|e| self.status.error(e.to_string()))?;
        self.status
            .success(format!("{name} model initialized ({})", llm.model_name()));

        state.llm = Some(Arc::clone(&llm));
        Ok(llm)
    }

    fn require_processed(&self, state: &SessionState) -> Result<(), DomainError> {
        state
            .processed()
            .inspect_err(|e| self.status.error(e.to_string()))
            .map(|_| ())
    }

    /// Saves a new upload, replacing the previous document and everything
    /// derived from it.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload(&self, filename: &str, bytes: &[u8]) -> Result<Document, DomainError> {
        let mut state = self.state.lock().await;

        let document = self
            .documents
            .store_upload(filename, bytes)
            .await
            .inspect_err(|e| self.status.error(format!("Upload failed: {e}")))?;

        if let Some(previous) = state.document.replace(document.clone()) {
            if let Err(e) = self.documents.discard(&previous).await {
                self.status
                    .warn(format!("Could not remove {}: {e}", previous.filename));
            }
        }
        state.clear_derived();
        self.rag.clear().await?;

        self.status.info(format!(
            "Saved {} ({} bytes) to {}",
            document.filename,
            document.size_bytes,
            document.path.display()
        ));
        Ok(document)
    }

    /// Extracts, chunks and indexes the uploaded document.
    #[instrument(skip(self))]
    pub async fn process(&self) -> Result<ProcessReport, DomainError> {
        let mut state = self.state.lock().await;
        let document = state
            .document
            .clone()
            .ok_or(DomainError::NoDocumentUploaded)
            .inspect_err(|e| self.status.error(e.to_string()))?;

        state.clear_derived();
        self.status.set_progress(0.0);
        self.status
            .info(format!("Starting processing of {}", document.filename));

        let started = Instant::now();
        let outcome = match self.rag.clear().await {
            Ok(()) => self.run_pipeline(&document).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok((pages, characters, chunks)) => {
                let report = ProcessReport {
                    document: document.clone(),
                    pages: pages.len(),
                    characters,
                    chunks,
                    embedding_model: self.rag.embedding_model().to_string(),
                    vector_backend: self.rag.backend(),
                    elapsed_ms: started.elapsed().as_millis() as u64,
                };
                state.processed = Some(ProcessedDocument {
                    document_id: document.id,
                    pages,
                    chunk_count: chunks,
                });
                self.status.set_progress(1.0);
                self.status.finish_step();
                self.status.success(format!(
                    "PDF processing complete: {} pages, {chunks} chunks",
                    report.pages
                ));
                Ok(report)
            }
            Err(e) => {
                if let Err(clear_err) = self.rag.clear().await {
                    tracing::error!(error = %clear_err, "failed to clear index after processing error");
                }
                self.status.finish_step();
                self.status
                    .error(format!("Error processing {}: {e}", document.filename));
                Err(e)
            }
        }
    }

    async fn run_pipeline(
        &self,
        document: &Document,
    ) -> Result<(Vec<String>, usize, usize), DomainError> {
        let missing = self.rag.missing_credentials();
        if !missing.is_empty() {
            return Err(DomainError::missing_credentials(format!(
                "Embedding model {} needs {}. Enter the key for this session or set it in the environment.",
                self.rag.embedding_model(),
                missing.join(" and ")
            )));
        }

        self.status
            .begin_step("Step 1/3: Extracting text from PDF", 0.1);
        let text = self.documents.extract(document).await?;
        self.status.info(format!(
            "Loaded {} pages ({} characters)",
            text.page_count(),
            text.char_count()
        ));

        self.status
            .begin_step("Step 2/3: Splitting document into chunks", 0.3);
        let chunks = self.documents.chunk(document, &text);
        if chunks.is_empty() {
            return Err(DomainError::empty_document(format!(
                "No text chunks could be created from {}",
                document.filename
            )));
        }
        self.status
            .info(format!("Created {} text chunks", chunks.len()));

        self.status.begin_step(
            "Step 3/3: Generating embeddings and building the vector index",
            0.4,
        );
        let status = Arc::clone(&self.status);
        let indexed = self
            .rag
            .index_chunks(&chunks, move |done, total| {
                status.set_progress(0.4 + 0.55 * done as f32 / total.max(1) as f32);
                status.info(format!("Embedded {done}/{total} chunks"));
            })
            .await?;

        let characters = text.char_count();
        Ok((text.pages, characters, indexed))
    }

    /// Answers a question about the processed document and records the turn.
    #[instrument(skip(self))]
    pub async fn ask(&self, question: &str) -> Result<ConversationTurn, DomainError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(DomainError::validation("question must not be empty"));
        }

        let mut state = self.state.lock().await;
        self.require_processed(&state)?;
        let llm = self.ensure_llm(&mut state)?;

        self.status.info(format!("Querying: '{question}'"));
        match self.answers.answer(llm.as_ref(), question).await {
            Ok(answer) => {
                self.status.success("Response received");
                let turn = ConversationTurn::new(question, answer.text, answer.sources);
                state.conversation.add_turn(turn.clone());
                Ok(turn)
            }
            Err(e) => {
                self.status.error(format!("Error during query: {e}"));
                Err(e)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn summarize(&self) -> Result<Summary, DomainError> {
        let mut state = self.state.lock().await;
        self.require_processed(&state)?;
        let llm = self.ensure_llm(&mut state)?;

        self.status.info("Generating document summary");
        self.answers
            .summarize(llm.as_ref())
            .await
            .inspect(|_| self.status.success("Summary generated"))
            .inspect_err(|e| self.status.error(format!("Error generating summary: {e}")))
    }

    /// Runs structured extraction over every processed page.
    #[instrument(skip(self))]
    pub async fn extract(&self) -> Result<ExtractionReport, DomainError> {
        let mut state = self.state.lock().await;
        self.require_processed(&state)?;
        let llm = self.ensure_llm(&mut state)?;

        let name = state
            .document
            .as_ref()
            .map(|d| d.filename.clone())
            .unwrap_or_default();
        let pages = state.processed()?.pages.clone();

        self.status
            .begin_step(format!("Extracting structured data from {name}"), 0.0);
        let result = self
            .extraction
            .run(llm.as_ref(), &name, &pages, &self.status)
            .await;
        self.status.finish_step();

        let report = result.inspect_err(|e| self.status.error(format!("Extraction failed: {e}")))?;
        state.extraction = Some(report.clone());
        Ok(report)
    }

    /// Raw top-k retrieval over the processed document.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<SearchResult>, DomainError> {
        if query.trim().is_empty() {
            return Err(DomainError::validation("query must not be empty"));
        }
        let state = self.state.lock().await;
        self.require_processed(&state)?;

        let top_k = top_k.unwrap_or(self.rag.default_top_k());
        self.rag.retrieve_top_k(query, top_k).await
    }

    #[instrument(skip(self))]
    pub async fn set_provider(&self, provider: ModelProvider) {
        let mut state = self.state.lock().await;
        if state.provider != provider {
            state.provider = provider;
            state.llm = None;
            self.status
                .info(format!("Switched to {} model", provider.display_name()));
        }
    }

    #[instrument(skip(self, api_key, project_id, url))]
    pub async fn set_credentials(
        &self,
        provider: ModelProvider,
        api_key: Option<String>,
        project_id: Option<String>,
        url: Option<String>,
    ) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        state.credentials.set(provider, api_key, project_id, url)?;
        self.rag.use_credentials(&state.credentials);
        if state.provider == provider {
            state.llm = None;
        }
        self.status.success(format!(
            "{} credentials saved for this session",
            provider.display_name()
        ));
        Ok(())
    }

    pub fn status(&self) -> StatusSnapshot {
        self.status.snapshot()
    }

    pub async fn conversation(&self) -> Conversation {
        self.state.lock().await.conversation.clone()
    }

    pub async fn extraction_report(&self) -> Option<ExtractionReport> {
        self.state.lock().await.extraction.clone()
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, DomainError> {
        let state = self.state.lock().await;
        let indexed_chunks = self.rag.len().await?;

        Ok(SessionSnapshot {
            id: self.id,
            created_at: self.created_at,
            provider: state.provider,
            model: state.llm.as_ref().map(|llm| llm.model_name().to_string()),
            credentials: CredentialStatus {
                openai: state.credentials.has(ModelProvider::OpenAi),
                watsonx: state.credentials.has(ModelProvider::Watsonx),
                embeddings: self.rag.missing_credentials().is_empty(),
            },
            document: state.document.clone(),
            processed: state.processed.is_some(),
            processed_document_id: state.processed.as_ref().map(|p| p.document_id),
            pages: state.processed.as_ref().map_or(0, |p| p.pages.len()),
            chunks: state.processed.as_ref().map_or(0, |p| p.chunk_count),
            indexed_chunks,
            turns: state.conversation.len(),
            has_extraction: state.extraction.is_some(),
            embedding_model: self.rag.embedding_model().to_string(),
            vector_backend: self.rag.backend(),
        })
    }

    /// Number of chunks in the index; fails when the index is unreachable.
    pub async fn indexed_chunks(&self) -> Result<usize, DomainError> {
        self.rag.len().await
    }

    pub fn vector_backend(&self) -> &'static str {
        self.rag.backend()
    }

    /// Drops the document and everything derived from it. Provider and
    /// credentials are kept.
    #[instrument(skip(self))]
    pub async fn reset(&self) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;

        if let Some(document) = state.document.take() {
            if let Err(e) = self.documents.discard(&document).await {
                tracing::warn!(error = %e, "failed to remove uploaded file");
            }
        }
        state.clear_derived();
        self.rag.clear().await?;
        self.status.clear();

        tracing::info!(session = %self.id, "session reset");
        Ok(())
    }

    /// Releases the index when the server stops.
    pub async fn close(&self) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        if let Some(document) = state.document.take() {
            self.documents.discard(&document).await?;
        }
        self.rag.teardown().await
    }
}
