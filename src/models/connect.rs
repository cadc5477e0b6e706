//! Wire types of the `/connect` flow: inbound query, immediate acknowledgment
//! and the callback payloads delivered once processing finishes.

use serde::{Deserialize, Serialize};

use super::ErrorType;

/// Raw `/connect` query parameters. Every field is optional at this level so the
/// handler can report all missing parameters with a redirect instead of a 400.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
    pub callback_url: Option<String>,
    pub data: Option<String>,
    pub request_id: Option<String>,
}

/// A `/connect` request with all four parameters present.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub token: String,
    pub callback_url: String,
    pub data: String,
    pub request_id: String,
}

/// Returned when at least one required parameter is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingParams {
    /// The supplied request id, or `"unknown"`
    pub request_id: String,
}

pub const MISSING_PARAMS_MESSAGE: &str =
    "Missing required parameters: token, callback_url, data, request_id";

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ConnectParams {
    pub fn into_request(self) -> Result<ConnectRequest, MissingParams> {
        let request_id = present(self.request_id);
        match (present(self.token), present(self.callback_url), present(self.data), request_id.clone()) {
            (Some(token), Some(callback_url), Some(data), Some(request_id)) => Ok(ConnectRequest {
                token,
                callback_url,
                data,
                request_id,
            }),
            _ => Err(MissingParams {
                request_id: request_id.unwrap_or_else(|| "unknown".to_string()),
            }),
        }
    }
}

/// Immediate acknowledgment returned to the synchronous caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AcceptedResponse {
    pub status: String,
    pub message: String,
    pub request_id: String,
}

impl AcceptedResponse {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            status: "accepted".to_string(),
            message: "Request received, processing started".to_string(),
            request_id: request_id.into(),
        }
    }
}

/// Payload POSTed to the caller's `callback_url`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CallbackPayload {
    Success {
        request_id: String,
        summary: SuccessSummary,
        record_ids: RecordIds,
        timestamp: String,
    },
    Failure {
        request_id: String,
        error: FailureDetails,
        redirect_url: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuccessSummary {
    pub data_extracted: bool,
    pub zoho_crm_namespace_stored: bool,
    pub badge_authenticated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordIds {
    pub zoho_crm_record_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailureDetails {
    pub code: ErrorType,
    pub message: String,
    pub timestamp: String,
    pub error_page_url: String,
}

impl CallbackPayload {
    pub fn success(request_id: &str, record_id: impl Into<String>) -> Self {
        CallbackPayload::Success {
            request_id: request_id.to_string(),
            summary: SuccessSummary {
                data_extracted: true,
                zoho_crm_namespace_stored: true,
                badge_authenticated: true,
            },
            record_ids: RecordIds {
                zoho_crm_record_id: record_id.into(),
            },
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn failure(request_id: &str, code: ErrorType, message: &str, error_page_url: String) -> Self {
        CallbackPayload::Failure {
            request_id: request_id.to_string(),
            error: FailureDetails {
                code,
                message: message.to_string(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                error_page_url: error_page_url.clone(),
            },
            redirect_url: error_page_url,
        }
    }

    pub fn request_id(&self) -> &str {
        match self {
            CallbackPayload::Success { request_id, .. } | CallbackPayload::Failure { request_id, .. } => request_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CallbackPayload::Success { .. })
    }
}

/// Builds the relative diagnostic page link `/error?type=..&message=..&request_id=..`.
pub fn error_page_path(error_type: ErrorType, message: &str, request_id: &str, details: Option<&str>) -> String {
    let mut path = format!(
        "/error?type={}&message={}&request_id={}",
        error_type.as_str(),
        urlencoding::encode(message),
        urlencoding::encode(request_id)
    );
    if let Some(details) = details.filter(|d| !d.is_empty()) {
        path.push_str("&details=");
        path.push_str(&urlencoding::encode(details));
    }
    path
}
