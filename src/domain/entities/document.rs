use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// An uploaded PDF as stored in the upload directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub filename: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub size_bytes: u64,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    pub fn new(filename: impl Into<String>, path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            path: path.into(),
            size_bytes,
            content_type: "application/pdf".to_string(),
            uploaded_at: Utc::now(),
        }
    }
}

/// Text extracted from a document, one entry per page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText {
    pub pages: Vec<String>,
}

impl ExtractedText {
    pub fn new(pages: Vec<String>) -> Self {
        Self { pages }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.trim().is_empty())
    }

    pub fn char_count(&self) -> usize {
        self.pages.iter().map(|p| p.chars().count()).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub content: String,
    pub chunk_index: usize,
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    pub fn new(document_id: Uuid, content: impl Into<String>, chunk_index: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            content: content.into(),
            chunk_index,
            metadata: ChunkMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: ChunkMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Where a chunk came from. Offsets are byte offsets into the page text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub page: Option<usize>,
    pub start_offset: usize,
    pub end_offset: usize,
    pub overlap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: DocumentChunk,
    pub score: f32,
}
