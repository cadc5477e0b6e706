use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Margin subtracted from `expires_at` when deciding whether a credential is usable.
pub const EXPIRY_SAFETY_MARGIN_SECS: i64 = 5 * 60;

/// TTL assumed when the provider omits `expires_in`.
pub const DEFAULT_TTL_SECS: i64 = 3600;

/// An access token issued by the Zoho accounts server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub token_type: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub refresh_token: Option<String>,
    pub api_domain: Option<String>,
}

impl Credential {
    pub fn new(
        access_token: String,
        token_type: String,
        ttl_secs: i64,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            token_type,
            issued_at,
            expires_at: issued_at + Duration::seconds(ttl_secs),
            refresh_token: None,
            api_domain: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: Option<String>) -> Self {
        self.refresh_token = refresh_token;
        self
    }

    pub fn with_api_domain(mut self, api_domain: Option<String>) -> Self {
        self.api_domain = api_domain;
        self
    }

    /// `true` while `now < expires_at - 5 min`.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - Duration::seconds(EXPIRY_SAFETY_MARGIN_SECS)
    }

    pub fn is_usable(&self) -> bool {
        self.is_usable_at(Utc::now())
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Body of a successful response from `/oauth/v2/token`.
///
/// Zoho answers some rejections with HTTP 200 and an `error` field, so every
/// field is optional here and the client decides what the body means.
#[derive(Debug, Default, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
    pub api_domain: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}
