//! `POST /api/ask/ai`: one authenticated question, one persisted answer.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub input: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub response: String,
}

/// 处理同步提问
///
/// Checks run in this order and stop at the first failure: identity, request
/// body, upstream call, persistence.
pub async fn ask_ai(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let user_ref = user.user_ref().map_err(|e| {
        error!("Authenticated request carries an empty user id");
        e
    })?;

    let Json(request) = payload.map_err(|rejection| {
        debug!(error = %rejection, "rejected ask request body");
        ApiError::InvalidRequest
    })?;

    info!(user_id = %user_ref, input_len = request.input.len(), "ask request");

    let response = state
        .completion
        .complete(&request.input)
        .await
        .map_err(|e| {
            error!(error = %e, "AI service call failed");
            ApiError::AiService
        })?;

    state
        .conversations
        .save(Some(&user_ref), &request.input, &response)
        .await
        .map_err(|e| {
            error!(error = %e, "failed to persist conversation");
            if e.is_collection_not_found() {
                ApiError::CollectionNotFound
            } else {
                ApiError::SaveFailed
            }
        })?;

    Ok(Json(AskResponse { response }))
}
