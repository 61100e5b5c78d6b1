mod answer;
mod document;
mod extraction;
mod rag;
mod session;

pub use answer::{build_context, to_sources, Answer, AnswerService, Summary};
pub use document::DocumentService;
pub use extraction::ExtractionService;
pub use rag::RagService;
pub use session::{CredentialStatus, ProcessReport, Session, SessionSnapshot};
