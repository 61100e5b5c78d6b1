use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use std::path::Path;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::domain::{DomainError, ExtractionReport};
use crate::infrastructure::extraction_csv;

pub async fn run_extraction(State(state): State<AppState>) -> ApiResult<ExtractionReport> {
    Ok(Json(state.session.extract().await?))
}

async fn last_report(state: &AppState) -> Result<ExtractionReport, ApiError> {
    state
        .session
        .extraction_report()
        .await
        .ok_or_else(|| DomainError::not_found("no extraction has been run yet").into())
}

pub async fn get_extraction(State(state): State<AppState>) -> ApiResult<ExtractionReport> {
    last_report(&state).await.map(Json)
}

/// The last extraction as a CSV download.
pub async fn export_extraction(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let report = last_report(&state).await?;
    let csv = extraction_csv(&report)?;

    let stem = Path::new(&report.document)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document")
        .replace('"', "");
    let disposition = format!("attachment; filename=\"{stem}_extraction.csv\"");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}
