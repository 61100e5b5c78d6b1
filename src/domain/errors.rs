use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Document contains no extractable text: {0}")]
    EmptyDocument(String),

    #[error("No document has been uploaded yet.")]
    NoDocumentUploaded,

    #[error("No document has been processed yet.")]
    NoDocumentProcessed,

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    pub fn invalid_document(msg: impl Into<String>) -> Self {
        Self::InvalidDocument(msg.into())
    }

    pub fn empty_document(msg: impl Into<String>) -> Self {
        Self::EmptyDocument(msg.into())
    }

    pub fn missing_credentials(msg: impl Into<String>) -> Self {
        Self::MissingCredentials(msg.into())
    }

    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    pub fn external(msg: impl Into<String>) -> Self {
        Self::ExternalService(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Io(_) => "io",
            Self::InvalidDocument(_) => "invalid_document",
            Self::EmptyDocument(_) => "empty_document",
            Self::NoDocumentUploaded => "no_document_uploaded",
            Self::NoDocumentProcessed => "no_document_processed",
            Self::MissingCredentials(_) => "missing_credentials",
            Self::Authentication(_) => "authentication",
            Self::ExternalService(_) => "external_service",
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_document_message() {
        assert_eq!(
            DomainError::NoDocumentProcessed.to_string(),
            "No document has been processed yet."
        );
        assert_eq!(DomainError::NoDocumentProcessed.code(), "no_document_processed");
    }

    #[test]
    fn test_io_error_conversion() {
        let err: DomainError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing.pdf").into();
        assert!(matches!(err, DomainError::Io(_)));
    }
}
