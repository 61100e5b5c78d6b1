use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::application::SessionSnapshot;
use crate::domain::{ModelProvider, StatusSnapshot};

#[derive(Debug, Deserialize)]
pub struct ProviderRequest {
    pub provider: String,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub provider: String,
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub url: Option<String>,
}

pub async fn get_session(State(state): State<AppState>) -> ApiResult<SessionSnapshot> {
    Ok(Json(state.session.snapshot().await?))
}

pub async fn reset_session(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.session.reset().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_provider(
    State(state): State<AppState>,
    Json(request): Json<ProviderRequest>,
) -> ApiResult<SessionSnapshot> {
    let provider: ModelProvider = request.provider.parse()?;
    state.session.set_provider(provider).await;
    Ok(Json(state.session.snapshot().await?))
}

pub async fn set_credentials(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> ApiResult<SessionSnapshot> {
    let provider: ModelProvider = request.provider.parse()?;
    state
        .session
        .set_credentials(provider, request.api_key, request.project_id, request.url)
        .await?;
    Ok(Json(state.session.snapshot().await?))
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.session.status())
}
