use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::utils::logging::*;
use crate::AppState;

pub async fn health_check() -> Json<Value> {
    log_health_check();

    Json(json!({
        "status": "healthy",
        "service": "zoho-dataswyft-connector",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Ready once a Zoho credential is cached or can be refreshed.
pub async fn ready_check(State(state): State<Arc<AppState>>) -> Result<Json<Value>, StatusCode> {
    let token_info = state.token_manager.token_info();
    let can_refresh = state.token_manager.has_refresh_token();
    let ready = can_refresh || token_info.as_ref().is_some_and(|t| t.is_valid);

    if !ready {
        log_warning("⚠️  [Ready] No Zoho credential available. Run /auth/zoho to authorize.");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(json!({
        "ready": true,
        "service": "zoho-dataswyft-connector",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "dependencies": {
            "zoho_crm": {
                "refresh_token_configured": can_refresh,
                "cached_token": token_info
            }
        }
    })))
}
