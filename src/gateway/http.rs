//! HTTP 接口（axum）
//!
//! - GET  /api/health
//! - GET  /api/tools
//! - POST /api/tools/:tool_name  `{input, sessionId?}`，input 缺失或非字符串时返回 400
//! - GET  /api/capabilities

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use super::message::timestamp;
use crate::core::Orchestrator;

/// 路由共享状态
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub started_at: Instant,
}

type ApiError = (StatusCode, Json<Value>);

pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = Arc::new(AppState {
        orchestrator,
        started_at: Instant::now(),
    });

    Router::new()
        .route("/api/health", get(api_health))
        .route("/api/tools", get(api_tools_list))
        .route("/api/tools/:tool_name", post(api_tool_execute))
        .route("/api/capabilities", get(api_capabilities))
        .with_state(state)
}

async fn api_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "OK",
        "uptimeSecs": state.started_at.elapsed().as_secs(),
        "sessions": state.orchestrator.session_count().await,
        "timestamp": timestamp(),
    }))
}

async fn api_tools_list(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "success": true,
        "tools": state.orchestrator.list_tools(),
        "timestamp": timestamp(),
    }))
}

async fn api_tool_execute(
    State(state): State<Arc<AppState>>,
    Path(tool_name): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    // 缺少请求体、非 JSON、input 非字符串或为空，一律按缺少 input 处理
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            tracing::debug!("Rejected tool request body: {}", rejection);
            Value::Null
        }
    };
    let Some(input) = body.get("input").and_then(Value::as_str).filter(|s| !s.is_empty()) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "Input is required" })),
        ));
    };
    let session_id = body
        .get("sessionId")
        .and_then(Value::as_str)
        .unwrap_or("rest-api");

    let outcome = state
        .orchestrator
        .use_tool(&tool_name, input, session_id)
        .await
        .map_err(|e| {
            tracing::error!("Tool execution error for {}: {}", tool_name, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
        })?;

    // 软失败时工具自己的 success:false 覆盖外层的 success:true
    let mut body = json!({ "success": true });
    if let (Value::Object(body_map), Value::Object(outcome_map)) = (&mut body, outcome.to_value()) {
        body_map.extend(outcome_map);
        body_map.insert("timestamp".to_string(), Value::String(timestamp()));
    }
    Ok(Json(body))
}

async fn api_capabilities(State(state): State<Arc<AppState>>) -> Json<Value> {
    let tools: Vec<String> = state
        .orchestrator
        .list_tools()
        .into_iter()
        .map(|t| t.name)
        .collect();
    Json(json!({
        "capabilities": {
            "personalizedGuidance": true,
            "stepByStep": true,
            "contentCreation": true,
            "tools": tools,
            "features": [
                "real-time chat",
                "session management",
                "preferences",
                "error handling",
            ],
        },
        "timestamp": timestamp(),
    }))
}
