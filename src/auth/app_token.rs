//! Caller application token
//!
//! The gateway has already verified the signature, so the connector only
//! decodes the payload and checks the claims it relies on.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::utils::{ConnectorError, ConnectorResult};

#[derive(Debug, Deserialize)]
struct RawClaims {
    iss: Option<String>,
    application: Option<String>,
    exp: Option<i64>,
}

/// Claims of a validated caller token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppClaims {
    /// Issuer; the caller's PDA URL
    pub issuer: String,
    pub application: String,
    pub expires_at: Option<DateTime<Utc>>,
}

fn invalid(message: impl Into<String>) -> ConnectorError {
    ConnectorError::InvalidToken(message.into())
}

/// Decodes and validates a caller token at `now`.
///
/// Rejects tokens that are not three dot-separated segments, whose payload is
/// not base64url JSON, that lack `iss` or `application`, whose `exp` is in the
/// past, or whose `application` differs from `expected_application` when set.
pub fn validate_app_token_at(
    token: &str,
    expected_application: Option<&str>,
    now: DateTime<Utc>,
) -> ConnectorResult<AppClaims> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 || segments[1].is_empty() {
        return Err(invalid("Failed to decode token: Invalid token format"));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(segments[1].trim_end_matches('='))
        .map_err(|_| invalid("Failed to decode token: Invalid token format"))?;

    let claims: RawClaims = serde_json::from_slice(&payload)
        .map_err(|e| invalid(format!("Failed to decode token: {}", e)))?;

    let issuer = claims
        .iss
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid("Token missing issuer (iss) claim"))?;

    let application = claims
        .application
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid("Token missing application claim"))?;

    let expires_at = match claims.exp {
        Some(exp) => Some(
            Utc.timestamp_opt(exp, 0)
                .single()
                .ok_or_else(|| invalid("Token has an invalid exp claim"))?,
        ),
        None => None,
    };

    if let Some(expires_at) = expires_at {
        if now.timestamp() > expires_at.timestamp() {
            return Err(invalid("Token has expired"));
        }
    }

    if let Some(expected) = expected_application.filter(|s| !s.is_empty()) {
        if application != expected {
            crate::utils::logging::log_error(&format!(
                "❌ [AppToken] Application ID mismatch: expected {}, got {}",
                expected, application
            ));
            return Err(invalid("Application ID mismatch"));
        }
    }

    Ok(AppClaims {
        issuer,
        application,
        expires_at,
    })
}

pub fn validate_app_token(token: &str, expected_application: Option<&str>) -> ConnectorResult<AppClaims> {
    validate_app_token_at(token, expected_application, Utc::now())
}

/// Unsigned token builder shared by the unit and integration tests.
#[doc(hidden)]
pub fn encode_unsigned(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}
