pub mod chunking;
pub mod entities;
pub mod errors;
pub mod ports;

pub use chunking::{chunk_pages, RecursiveSplitter};
pub use entities::*;
pub use errors::{DomainError, Result};
