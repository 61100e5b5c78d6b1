#[cfg(feature = "local-embeddings")]
mod local;
mod text;

#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbedding;
pub use text::TextEmbedding;
