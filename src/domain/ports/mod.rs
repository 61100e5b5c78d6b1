mod document_loader;
mod embedding;
mod file_store;
mod llm;
mod vector_store;

pub use document_loader::DocumentLoader;
pub use embedding::EmbeddingService;
pub use file_store::FileStore;
pub use llm::{LlmFactory, LlmService};
pub use vector_store::VectorStore;
