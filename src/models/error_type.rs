//! Error classifications shown on the diagnostic page and reported in failure callbacks.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorType {
    #[serde(rename = "EMAIL_NOT_FOUND")]
    EmailNotFound,
    #[serde(rename = "INVALID_TOKEN")]
    InvalidToken,
    #[serde(rename = "OAUTH_FAILURE")]
    OAuthFailure,
    #[serde(rename = "API_ERROR")]
    ApiError,
    #[serde(rename = "INVALID_DATA")]
    InvalidData,
}

/// Static presentation data for one error type.
#[derive(Debug, Clone, Copy)]
pub struct ErrorPageInfo {
    pub title: &'static str,
    pub status_code: u16,
    pub icon: &'static str,
    pub description: &'static str,
    pub user_action: &'static str,
    pub color: &'static str,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::EmailNotFound => "EMAIL_NOT_FOUND",
            ErrorType::InvalidToken => "INVALID_TOKEN",
            ErrorType::OAuthFailure => "OAUTH_FAILURE",
            ErrorType::ApiError => "API_ERROR",
            ErrorType::InvalidData => "INVALID_DATA",
        }
    }

    /// Parses a `type` query value; anything unrecognised falls back to `API_ERROR`.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value {
            Some("EMAIL_NOT_FOUND") => ErrorType::EmailNotFound,
            Some("INVALID_TOKEN") => ErrorType::InvalidToken,
            Some("OAUTH_FAILURE") => ErrorType::OAuthFailure,
            Some("INVALID_DATA") => ErrorType::InvalidData,
            _ => ErrorType::ApiError,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.page_info().status_code
    }

    pub fn page_info(&self) -> ErrorPageInfo {
        match self {
            ErrorType::EmailNotFound => ErrorPageInfo {
                title: "Contact Not Found",
                status_code: 404,
                icon: "🔍",
                description: "The merchant email address could not be found in Zoho CRM.",
                user_action: "Please contact support or verify the email address is correct.",
                color: "#f59e0b",
            },
            ErrorType::InvalidToken => ErrorPageInfo {
                title: "Authentication Failed",
                status_code: 401,
                icon: "🔐",
                description: "The authentication token is invalid or has expired.",
                user_action: "Please try again or contact your system administrator.",
                color: "#ef4444",
            },
            ErrorType::OAuthFailure => ErrorPageInfo {
                title: "Zoho CRM Connection Error",
                status_code: 401,
                icon: "🔗",
                description: "Unable to connect to Zoho CRM. Authentication failed.",
                user_action: "Please check the connector configuration.",
                color: "#ef4444",
            },
            ErrorType::ApiError => ErrorPageInfo {
                title: "Service Error",
                status_code: 500,
                icon: "⚠️",
                description: "An unexpected error occurred while processing your request.",
                user_action: "Please try again later or contact support.",
                color: "#dc2626",
            },
            ErrorType::InvalidData => ErrorPageInfo {
                title: "Invalid Request",
                status_code: 400,
                icon: "📋",
                description: "The request data is invalid or missing required information.",
                user_action: "Please check the request parameters and try again.",
                color: "#f59e0b",
            },
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
