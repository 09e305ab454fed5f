use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

/// 健康检查处理器
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "active_sessions": state.registry.len(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
