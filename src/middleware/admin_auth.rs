//! `X-Admin-Key` guard for the `/admin/*` routes.
//!
//! - `ADMIN_API_KEY` set: the header must match.
//! - unset in development: access allowed with a warning.
//! - unset with `RUST_ENV=production`: 503.

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, PartialEq, Eq)]
enum AdminAccess {
    Granted,
    Denied,
    NotConfigured,
}

fn check_access(expected: Option<&str>, provided: Option<&str>, is_production: bool) -> AdminAccess {
    match (expected.filter(|k| !k.is_empty()), provided) {
        (Some(expected), Some(provided)) if expected == provided => AdminAccess::Granted,
        (Some(_), _) => AdminAccess::Denied,
        (None, _) if is_production => AdminAccess::NotConfigured,
        (None, _) => AdminAccess::Granted,
    }
}

pub async fn require_admin_key(headers: HeaderMap, request: Request, next: Next) -> Result<Response, Response> {
    let provided_key = headers.get("X-Admin-Key").and_then(|v| v.to_str().ok());
    let expected_key = std::env::var("ADMIN_API_KEY").ok();
    let is_production = std::env::var("RUST_ENV").map(|e| e == "production").unwrap_or(false);

    match check_access(expected_key.as_deref(), provided_key, is_production) {
        AdminAccess::Granted => {
            if expected_key.is_none() {
                tracing::warn!("⚠️  ADMIN_API_KEY not configured - allowing admin access in development mode");
            }
            Ok(next.run(request).await)
        }
        AdminAccess::Denied => {
            tracing::warn!("❌ Admin access denied - invalid or missing X-Admin-Key");
            Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "Unauthorized",
                    "message": "Missing or invalid X-Admin-Key header"
                })),
            )
                .into_response())
        }
        AdminAccess::NotConfigured => {
            tracing::error!("🚨 ADMIN_API_KEY not configured in production! Blocking admin access.");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "Service Unavailable",
                    "message": "ADMIN_API_KEY not configured on server"
                })),
            )
                .into_response())
        }
    }
}
