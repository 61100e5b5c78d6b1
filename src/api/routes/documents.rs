use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::application::ProcessReport;
use crate::domain::{Document, DomainError, SearchResult};

#[derive(Debug, Deserialize)]
pub struct SearchDocumentsRequest {
    pub query: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResultResponse {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub chunk_index: usize,
    pub page: Option<usize>,
    pub content: String,
    pub score: f32,
}

impl From<SearchResult> for SearchResultResponse {
    fn from(result: SearchResult) -> Self {
        Self {
            chunk_id: result.chunk.id,
            document_id: result.chunk.document_id,
            chunk_index: result.chunk.chunk_index,
            page: result.chunk.metadata.page,
            content: result.chunk.content,
            score: result.score,
        }
    }
}

/// Accepts a multipart form with the PDF in the `file` field.
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Document> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DomainError::validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| DomainError::validation(format!("failed to read upload: {e}")))?;
        upload = Some((filename, data));
    }

    let (filename, data) =
        upload.ok_or_else(|| DomainError::validation("missing multipart field 'file'"))?;

    Ok(Json(state.session.upload(&filename, &data).await?))
}

pub async fn process_document(State(state): State<AppState>) -> ApiResult<ProcessReport> {
    Ok(Json(state.session.process().await?))
}

pub async fn search_documents(
    State(state): State<AppState>,
    Json(request): Json<SearchDocumentsRequest>,
) -> Result<Json<Vec<SearchResultResponse>>, ApiError> {
    let results = state
        .session
        .search(&request.query, request.limit)
        .await?;

    Ok(Json(results.into_iter().map(Into::into).collect()))
}
