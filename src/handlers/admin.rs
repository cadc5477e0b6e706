//! Credential cache administration (behind `X-Admin-Key`).

use axum::{extract::State, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::utils::logging::*;
use crate::AppState;

/// GET /admin/token
pub async fn token_info(State(state): State<Arc<AppState>>) -> Json<Value> {
    log_request_received("/admin/token", "GET");

    match state.token_manager.token_info() {
        Some(info) => Json(json!(info)),
        None => Json(json!({
            "has_token": false,
            "refresh_token_configured": state.token_manager.has_refresh_token()
        })),
    }
}

/// POST /admin/token/clear
pub async fn clear_token_cache(State(state): State<Arc<AppState>>) -> Json<Value> {
    log_request_received("/admin/token/clear", "POST");

    state.token_manager.clear_cache();

    Json(json!({
        "success": true,
        "message": "Token cache cleared",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
