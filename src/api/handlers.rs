//! Route handlers.

use super::error::ApiError;
use super::state::AppState;
use crate::fetcher::ConversationResults;
use crate::model::{DialogueResponse, TurnEvent};
use crate::router::Disposition;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// `POST /turns`: route one classified turn.
///
/// The body is always a dialogue-close event. The status code tells
/// machines what the message tells people: 200 for an accepted request or
/// a turn with no actionable intent, 400 for bad input, 500 when the work
/// queue refused the request.
pub async fn route_turn(
    State(state): State<AppState>,
    Json(turn): Json<TurnEvent>,
) -> (StatusCode, Json<DialogueResponse>) {
    let routed = state.router.route(turn).await;
    let status = match routed.disposition {
        Disposition::Enqueued { .. } | Disposition::NoIntent => StatusCode::OK,
        Disposition::Rejected => StatusCode::BAD_REQUEST,
        Disposition::EnqueueFailed => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(routed.response))
}

#[derive(Debug, Default, Deserialize)]
pub struct FetchParams {
    #[serde(default, alias = "sessionId")]
    pub conversation_id: Option<String>,
}

/// `GET /responses?conversation_id=...`
pub async fn fetch_responses(
    State(state): State<AppState>,
    Query(params): Query<FetchParams>,
) -> Result<Json<ConversationResults>, ApiError> {
    let results = state.fetcher.fetch(params.conversation_id.as_deref()).await?;
    Ok(Json(results))
}

/// `POST /responses` with `{"sessionId": ...}` or `{"conversation_id": ...}`.
pub async fn fetch_responses_post(
    State(state): State<AppState>,
    Json(params): Json<FetchParams>,
) -> Result<Json<ConversationResults>, ApiError> {
    let results = state.fetcher.fetch(params.conversation_id.as_deref()).await?;
    Ok(Json(results))
}
