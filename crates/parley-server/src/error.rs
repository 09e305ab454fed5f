//! HTTP 错误类型
//!
//! Every variant renders as `{"error": "<message>"}`; causes are logged by the
//! handler, never exposed.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("failed to retrieve user information")]
    UserInfo,

    #[error("invalid request")]
    InvalidRequest,

    #[error("AI service error")]
    AiService,

    #[error("conversations collection not found")]
    CollectionNotFound,

    #[error("failed to save conversation")]
    SaveFailed,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::InvalidRequest => StatusCode::BAD_REQUEST,
            ApiError::UserInfo
            | ApiError::AiService
            | ApiError::CollectionNotFound
            | ApiError::SaveFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
