use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::api::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub vector_store: String,
    pub indexed_chunks: Option<usize>,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let backend = state.session.vector_backend();

    match state.session.indexed_chunks().await {
        Ok(count) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready".into(),
                vector_store: backend.into(),
                indexed_chunks: Some(count),
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, backend, "vector store unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready".into(),
                    vector_store: backend.into(),
                    indexed_chunks: None,
                }),
            )
        }
    }
}
