use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::DomainError;

/// JSON error body: `{"error": <code>, "message": <text>}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::NoDocumentUploaded | DomainError::NoDocumentProcessed => {
                StatusCode::CONFLICT
            }
            DomainError::MissingCredentials(_) => StatusCode::PRECONDITION_FAILED,
            DomainError::InvalidDocument(_) | DomainError::EmptyDocument(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            DomainError::Authentication(_) | DomainError::ExternalService(_) => {
                StatusCode::BAD_GATEWAY
            }
            DomainError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            DomainError::Io(_) | DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, code = self.0.code(), "request failed");
        } else {
            tracing::warn!(error = %self.0, code = self.0.code(), "request rejected");
        }

        let body = ErrorBody {
            error: self.0.code(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;
