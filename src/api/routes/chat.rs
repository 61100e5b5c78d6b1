use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::application::Summary;
use crate::domain::ConversationTurn;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub turns: Vec<ConversationTurn>,
}

pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<ConversationTurn> {
    Ok(Json(state.session.ask(&request.question).await?))
}

pub async fn history(State(state): State<AppState>) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        turns: state.session.conversation().await.turns,
    })
}

pub async fn summarize(State(state): State<AppState>) -> ApiResult<Summary> {
    Ok(Json(state.session.summarize().await?))
}
