//! Application layer - Use cases and orchestration.
//!
//! Services depend on domain ports (traits) rather than concrete
//! implementations. `Session` ties them together for the single document
//! being analysed.

pub mod services;

pub use services::{
    AnswerService, DocumentService, ExtractionService, ProcessReport, RagService, Session,
    SessionSnapshot, Summary,
};
