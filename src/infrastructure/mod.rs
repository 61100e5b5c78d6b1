pub mod config;
pub mod embedding;
pub mod export;
pub mod llm;
pub mod pdf;
pub mod uploads;
pub mod vector_store;

pub use config::{load_credentials, AppConfig, Config, PromptsConfig};
#[cfg(feature = "local-embeddings")]
pub use embedding::LocalEmbedding;
pub use embedding::TextEmbedding;
pub use export::extraction_csv;
pub use llm::{HostedLlmFactory, OpenAiLlm, WatsonxLlm};
pub use pdf::PdfLoader;
pub use uploads::LocalFileStore;
pub use vector_store::{InMemoryVectorStore, QdrantVectorStore};
