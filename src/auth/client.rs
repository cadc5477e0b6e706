//! OAuth2 HTTP Client
//!
//! Stateless translation of the two Zoho grant exchanges into [`Credential`]s.
//! No retries and no caching here: the pipeline owns retry policy and the
//! [`TokenManager`](super::TokenManager) owns the cache.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::time::Duration;

use super::credential::{Credential, TokenResponse, DEFAULT_TTL_SECS};
use super::OAuth2Config;
use crate::utils::logging::*;
use crate::utils::{mask_secret, retry_after_from_headers, ConnectorError, ConnectorResult};

/// The two grant exchanges against the upstream accounts server.
#[async_trait]
pub trait CredentialExchange: Send + Sync {
    /// Trades a one-time authorization code (valid ~3 minutes) for a credential.
    async fn exchange_authorization_code(&self, code: &str) -> ConnectorResult<Credential>;

    /// Trades the long-lived refresh token for a new access credential.
    async fn refresh(&self, refresh_token: &str) -> ConnectorResult<Credential>;
}

/// OAuth2 client for the Zoho accounts server
pub struct OAuth2Client {
    config: OAuth2Config,
    http_client: Client,
}

impl OAuth2Client {
    /// Creates a client whose requests all carry `timeout`.
    pub fn new(config: OAuth2Config, timeout: Duration) -> ConnectorResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConnectorError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http_client })
    }

    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }

    async fn request_token(&self, grant: &'static str, params: &[(&str, &str)]) -> ConnectorResult<Credential> {
        let url = self.config.token_url();

        let masked: Vec<String> = params
            .iter()
            .map(|(k, v)| match *k {
                "grant_type" | "redirect_uri" => format!("{}={}", k, v),
                _ => format!("{}={}", k, mask_secret(v)),
            })
            .collect();
        log_info(&format!("📤 [OAuth2] POST {} - {}", url, masked.join(", ")));

        let response = self
            .http_client
            .post(&url)
            .form(params)
            .send()
            .await
            .map_err(|e| ConnectorError::from_transport(&format!("{} exchange", grant), &e))?;

        let status = response.status();
        let retry_after = retry_after_from_headers(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| ConnectorError::from_transport(&format!("{} exchange", grant), &e))?;

        let parsed: Option<TokenResponse> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            log_upstream_api_error(&url, Some(status.as_u16()), &body);

            if status.as_u16() == 429 {
                return Err(ConnectorError::RateLimited { retry_after });
            }
            if status.is_server_error() {
                return Err(ConnectorError::UpstreamUnavailable(format!(
                    "{} exchange [{}]: {}",
                    grant,
                    status.as_u16(),
                    body
                )));
            }

            let parsed = parsed.unwrap_or_default();
            return Err(ConnectorError::Exchange {
                code: parsed.error.unwrap_or_else(|| status.as_u16().to_string()),
                description: parsed
                    .error_description
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string()),
            });
        }

        let token_response = parsed.ok_or_else(|| {
            ConnectorError::UpstreamUnavailable(format!("{} exchange: invalid JSON response: {}", grant, body))
        })?;

        if let Some(error) = token_response.error {
            log_error(&format!("❌ [OAuth2] {} exchange rejected: {}", grant, error));
            return Err(ConnectorError::Exchange {
                code: error,
                description: token_response.error_description.unwrap_or_default(),
            });
        }

        let access_token = token_response.access_token.ok_or_else(|| ConnectorError::Exchange {
            code: "no_access_token".to_string(),
            description: format!("No access token received. Response: {}", body),
        })?;

        let api_domain = token_response
            .api_domain
            .unwrap_or_else(|| self.config.default_api_domain.clone());

        let credential = Credential::new(
            access_token,
            token_response.token_type.unwrap_or_else(|| "Bearer".to_string()),
            token_response.expires_in.unwrap_or(DEFAULT_TTL_SECS),
            Utc::now(),
        )
        .with_refresh_token(token_response.refresh_token)
        .with_api_domain(Some(api_domain));

        log_info(&format!(
            "✅ [OAuth2] {} exchange succeeded: {} (expires {})",
            grant,
            mask_secret(&credential.access_token),
            credential.expires_at.to_rfc3339()
        ));

        Ok(credential)
    }
}

#[async_trait]
impl CredentialExchange for OAuth2Client {
    async fn exchange_authorization_code(&self, code: &str) -> ConnectorResult<Credential> {
        log_info("🔐 [OAuth2] Exchanging authorization code for access token...");

        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code", code),
        ];

        self.request_token("authorization_code", &params).await
    }

    async fn refresh(&self, refresh_token: &str) -> ConnectorResult<Credential> {
        log_info("🔄 [OAuth2] Refreshing access token...");

        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token),
        ];

        self.request_token("refresh_token", &params).await
    }
}
