use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::models::ErrorType;

/// Error taxonomy shared by the upstream clients, the credential store and the
/// connect pipeline.
///
/// Each variant is produced by the layer that observes the condition (HTTP
/// status, reqwest timeout, JSON parse), never re-derived from message text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectorError {
    /// Caller token missing, malformed or expired
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Missing request parameters or malformed payload
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Upstream resource absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// OAuth grant rejected by the provider (code/description kept verbatim)
    #[error("Token exchange failed: {code} - {description}")]
    Exchange { code: String, description: String },

    /// Timeout or connection failure
    #[error("Network error: {0}")]
    Network(String),

    /// Provider throttling
    #[error("Rate limit exceeded (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Provider denies access to the resource
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Generic 5xx or unclassified upstream failure
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Connector misconfiguration (missing refresh token, credentials, ...)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ConnectorError {
    /// Classifies a transport-level reqwest failure.
    ///
    /// Timeouts and connection failures are `Network`; anything else that never
    /// produced a usable response is treated as the upstream being unavailable.
    pub fn from_transport(context: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            ConnectorError::Network(format!("{}: {}", context, err))
        } else if err.is_decode() {
            ConnectorError::UpstreamUnavailable(format!("{}: invalid response body: {}", context, err))
        } else {
            ConnectorError::UpstreamUnavailable(format!("{}: {}", context, err))
        }
    }

    /// Classifies a non-success HTTP status returned by an upstream API.
    pub fn from_status(
        context: &str,
        status: reqwest::StatusCode,
        retry_after: Option<Duration>,
        body: &str,
    ) -> Self {
        let detail = format!("{} [{}]: {}", context, status.as_u16(), body);
        match status.as_u16() {
            401 | 403 => ConnectorError::Permission(detail),
            404 => ConnectorError::NotFound(detail),
            429 => ConnectorError::RateLimited { retry_after },
            400 | 422 => ConnectorError::InvalidData(detail),
            _ => ConnectorError::UpstreamUnavailable(detail),
        }
    }

    /// Classifies a non-success HTTP status from a write target (wallet, callback).
    ///
    /// Only the contact search can report a missing contact or a bad query, so
    /// 404 and 400/422 here are upstream failures rather than `NotFound`/`InvalidData`.
    pub fn from_write_status(
        context: &str,
        status: reqwest::StatusCode,
        retry_after: Option<Duration>,
        body: &str,
    ) -> Self {
        let detail = format!("{} [{}]: {}", context, status.as_u16(), body);
        match status.as_u16() {
            401 | 403 => ConnectorError::Permission(detail),
            429 => ConnectorError::RateLimited { retry_after },
            _ => ConnectorError::UpstreamUnavailable(detail),
        }
    }

    /// Diagnostic page type reported to the caller for this error.
    pub fn error_type(&self) -> ErrorType {
        match self {
            ConnectorError::NotFound(_) => ErrorType::EmailNotFound,
            ConnectorError::InvalidToken(_) => ErrorType::InvalidToken,
            ConnectorError::Exchange { .. } | ConnectorError::Config(_) => ErrorType::OAuthFailure,
            ConnectorError::InvalidData(_) => ErrorType::InvalidData,
            ConnectorError::Network(_)
            | ConnectorError::RateLimited { .. }
            | ConnectorError::Permission(_)
            | ConnectorError::UpstreamUnavailable(_) => ErrorType::ApiError,
        }
    }

    /// Short label used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ConnectorError::InvalidToken(_) => "invalid_token",
            ConnectorError::InvalidData(_) => "invalid_data",
            ConnectorError::NotFound(_) => "not_found",
            ConnectorError::Exchange { .. } => "exchange",
            ConnectorError::Network(_) => "network",
            ConnectorError::RateLimited { .. } => "rate_limited",
            ConnectorError::Permission(_) => "permission",
            ConnectorError::UpstreamUnavailable(_) => "upstream_unavailable",
            ConnectorError::Config(_) => "config",
        }
    }
}

pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Reads a `Retry-After` header expressed in seconds.
pub fn retry_after_from_headers(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[derive(Debug)]
pub enum AppError {
    Connector(ConnectorError),
    ValidationError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Connector(err) => write!(f, "{}", err),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<ConnectorError> for AppError {
    fn from(err: ConnectorError) -> Self {
        AppError::Connector(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Connector(err) => {
                let status = match &err {
                    ConnectorError::InvalidToken(_) | ConnectorError::Exchange { .. } => StatusCode::UNAUTHORIZED,
                    ConnectorError::InvalidData(_) => StatusCode::BAD_REQUEST,
                    ConnectorError::NotFound(_) => StatusCode::NOT_FOUND,
                    ConnectorError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, err.to_string())
            }
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = json!({
            "error": error_message,
            "status": status.as_u16()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
