use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

use super::RagService;
use crate::domain::{ports::LlmService, DomainError, SearchResult, SourceRef};
use crate::infrastructure::PromptsConfig;

const EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SourceRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub text: String,
    pub sources: Vec<SourceRef>,
    pub generated_at: DateTime<Utc>,
}

/// Retrieval-augmented answers and summaries over the indexed document.
pub struct AnswerService {
    rag: Arc<RagService>,
    prompts: PromptsConfig,
}

impl AnswerService {
    pub fn new(rag: Arc<RagService>, prompts: PromptsConfig) -> Self {
        Self { rag, prompts }
    }

    #[instrument(skip(self, llm), fields(model = llm.model_name()))]
    pub async fn answer(&self, llm: &dyn LlmService, question: &str) -> Result<Answer, DomainError> {
        let results = self.rag.retrieve(question).await?;
        let prompt = self.prompts.answer_prompt(&build_context(&results), question);

        let text = llm
            .complete_with_system(&self.prompts.answer.system, &prompt)
            .await?;

        Ok(Answer {
            text: text.trim().to_string(),
            sources: to_sources(&results),
        })
    }

    #[instrument(skip(self, llm), fields(model = llm.model_name()))]
    pub async fn summarize(&self, llm: &dyn LlmService) -> Result<Summary, DomainError> {
        let summary = &self.prompts.summary;
        let results = self.rag.retrieve_top_k(&summary.query, summary.top_k).await?;
        let prompt = self.prompts.summary_prompt(&build_context(&results));

        let text = llm.complete(&prompt).await?;

        Ok(Summary {
            text: text.trim().to_string(),
            sources: to_sources(&results),
            generated_at: Utc::now(),
        })
    }
}

/// Stuffs every retrieved chunk into one context block.
pub fn build_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| r.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn to_sources(results: &[SearchResult]) -> Vec<SourceRef> {
    results
        .iter()
        .map(|r| SourceRef {
            chunk_index: r.chunk.chunk_index,
            page: r.chunk.metadata.page,
            score: r.score,
            excerpt: excerpt(&r.chunk.content),
        })
        .collect()
}

fn excerpt(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
