//! Zoho CRM contact search
//!
//! Every request asks the [`TokenManager`] for the current credential; the
//! API domain comes from the credential (Zoho is region-sharded).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use super::data_mapper::{Contact, CONTACT_FIELDS, SEARCH_ENDPOINT};
use crate::auth::TokenManager;
use crate::utils::logging::*;
use crate::utils::{retry_after_from_headers, ConnectorError, ConnectorResult};

/// Source of CRM contacts.
#[async_trait]
pub trait ContactSource: Send + Sync {
    /// All contacts whose email matches; empty when there are none.
    async fn search_by_email(&self, email: &str) -> ConnectorResult<Vec<Contact>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Contact>,
}

pub struct ZohoCrmClient {
    http_client: Client,
    token_manager: Arc<TokenManager>,
    default_api_domain: String,
}

impl ZohoCrmClient {
    pub fn new(
        token_manager: Arc<TokenManager>,
        default_api_domain: impl Into<String>,
        timeout: Duration,
    ) -> ConnectorResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConnectorError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            token_manager,
            default_api_domain: default_api_domain.into(),
        })
    }
}

#[async_trait]
impl ContactSource for ZohoCrmClient {
    async fn search_by_email(&self, email: &str) -> ConnectorResult<Vec<Contact>> {
        let credential = self.token_manager.get_valid_credential().await?;

        let api_domain = credential
            .api_domain
            .as_deref()
            .unwrap_or(&self.default_api_domain)
            .trim_end_matches('/');
        let url = format!("{}{}", api_domain, SEARCH_ENDPOINT);

        let fields = CONTACT_FIELDS.join(",");

        log_info(&format!("🔍 [ZohoCRM] Searching contact by email: {}", email));

        let response = self
            .http_client
            .get(&url)
            .query(&[("email", email), ("fields", fields.as_str())])
            .header("Authorization", credential.authorization_header())
            .send()
            .await
            .map_err(|e| ConnectorError::from_transport("Zoho contact search", &e))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            log_info(&format!("📭 [ZohoCRM] No contact found for {}", email));
            return Ok(Vec::new());
        }

        let retry_after = retry_after_from_headers(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| ConnectorError::from_transport("Zoho contact search", &e))?;

        if !status.is_success() {
            log_upstream_api_error(&url, Some(status.as_u16()), &body);

            return Err(match status {
                StatusCode::UNAUTHORIZED => {
                    // Revoked or rotated token: the next attempt refreshes
                    self.token_manager.clear_cache();
                    ConnectorError::UpstreamUnavailable(format!(
                        "Zoho contact search rejected the access token: {}",
                        body
                    ))
                }
                StatusCode::NOT_FOUND => ConnectorError::UpstreamUnavailable(format!(
                    "Zoho contact search endpoint not available: {}",
                    body
                )),
                _ => ConnectorError::from_status("Zoho contact search", status, retry_after, &body),
            });
        }

        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        let parsed: SearchResponse = serde_json::from_str(&body).map_err(|e| {
            ConnectorError::UpstreamUnavailable(format!("Zoho contact search: invalid JSON response: {}", e))
        })?;

        log_info(&format!(
            "✅ [ZohoCRM] {} contact(s) found for {}",
            parsed.data.len(),
            email
        ));

        Ok(parsed.data)
    }
}
