mod conversation;
mod credentials;
mod document;
mod embedding;
mod extraction;
mod status;

pub use conversation::{Conversation, ConversationTurn, SourceRef};
pub use credentials::{
    Credentials, ModelProvider, OPENAI_API_KEY, WATSONX_API_KEY, WATSONX_PROJECT_ID, WATSONX_URL,
};
pub use document::{ChunkMetadata, Document, DocumentChunk, ExtractedText, SearchResult};
pub use embedding::Embedding;
pub use extraction::{clean_response, parse_records, ExtractedRecord, ExtractionReport};
pub use status::{StatusEntry, StatusLevel, StatusLog, StatusSnapshot};
