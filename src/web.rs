//! HTTP 前端路由
//!
//! POST /api/chat `{thread_id, query}` 返回结构化结果；致命错误只返回通用错误体，细节进日志。

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::agent::BaristaAgent;
use crate::core::AgentError;
use crate::response::StructuredTurnResult;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub thread_id: String,
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

pub fn create_router(agent: Arc<BaristaAgent>) -> Router {
    Router::new()
        .route("/api/chat", post(api_chat))
        .route("/api/health", get(|| async { "OK" }))
        .with_state(agent)
}

async fn api_chat(
    State(agent): State<Arc<BaristaAgent>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<StructuredTurnResult>, ApiError> {
    match agent.process_turn(&req.thread_id, &req.query).await {
        Ok(result) => Ok(Json(result)),
        Err(AgentError::InvalidRequest(reason)) => {
            Err((StatusCode::BAD_REQUEST, Json(ErrorBody { error: reason })))
        }
        Err(e) => {
            tracing::error!(thread_id = %req.thread_id, kind = e.kind(), error = %e, "chat request failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: "the order assistant could not complete this turn".to_string(),
                }),
            ))
        }
    }
}
