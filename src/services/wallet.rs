//! Dataswyft wallet writer
//!
//! The wallet has its own username/password login; the resulting token is
//! kept for one hour.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::data_mapper::WalletRecord;
use crate::utils::logging::*;
use crate::utils::{retry_after_from_headers, ConnectorError, ConnectorResult};

const WALLET_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Destination for mapped records.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Writes `record` under `namespace/endpoint` and returns the stored record id.
    async fn write(&self, namespace: &str, endpoint: &str, record: &WalletRecord) -> ConnectorResult<String>;
}

#[derive(Debug, Clone)]
struct CachedWalletToken {
    token: String,
    obtained_at: Instant,
}

pub struct DataswyftWalletClient {
    http_client: Client,
    api_url: String,
    username: String,
    password: String,
    token: RwLock<Option<CachedWalletToken>>,
}

/// Extracts the record id, falling back to `"unknown"`.
fn record_id_from(body: &Value) -> String {
    ["recordId", "id"]
        .iter()
        .find_map(|key| match body.get(*key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| "unknown".to_string())
}

impl DataswyftWalletClient {
    pub fn new(
        api_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> ConnectorResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConnectorError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            token: RwLock::new(None),
        })
    }

    async fn access_token(&self) -> ConnectorResult<String> {
        // 1. Cached token
        {
            let cache = self.token.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| c.obtained_at.elapsed() < WALLET_TOKEN_TTL) {
                return Ok(cached.token.clone());
            }
        }

        if self.username.is_empty() || self.password.is_empty() {
            return Err(ConnectorError::Config(
                "DATASWIFT_USERNAME and DATASWIFT_PASSWORD are required".to_string(),
            ));
        }

        // 2. Log in
        log_info("🔄 [Wallet] Getting Dataswyft access token...");

        let url = format!("{}/users/access_token", self.api_url);
        let response = self
            .http_client
            .get(&url)
            .header("Accept", "application/json")
            .header("username", &self.username)
            .header("password", &self.password)
            .send()
            .await
            .map_err(|e| ConnectorError::from_transport("Dataswyft login", &e))?;

        let status = response.status();
        let retry_after = retry_after_from_headers(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| ConnectorError::from_transport("Dataswyft login", &e))?;

        if !status.is_success() {
            log_upstream_api_error(&url, Some(status.as_u16()), &body);
            return Err(ConnectorError::from_write_status("Dataswyft login", status, retry_after, &body));
        }

        // Either {"accessToken": "..."} or the bare token
        let token = match serde_json::from_str::<Value>(&body) {
            Ok(Value::Object(map)) => map
                .get("accessToken")
                .and_then(Value::as_str)
                .map(str::to_string),
            Ok(Value::String(s)) => Some(s),
            _ => Some(body.trim().to_string()),
        }
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ConnectorError::UpstreamUnavailable("Dataswyft login returned no access token".to_string()))?;

        // 3. Cache
        *self.token.write().await = Some(CachedWalletToken {
            token: token.clone(),
            obtained_at: Instant::now(),
        });

        log_info("✅ [Wallet] Access token obtained");
        Ok(token)
    }
}

#[async_trait]
impl RecordSink for DataswyftWalletClient {
    async fn write(&self, namespace: &str, endpoint: &str, record: &WalletRecord) -> ConnectorResult<String> {
        let token = self.access_token().await?;
        let url = format!("{}/api/v2.6/data/{}/{}", self.api_url, namespace, endpoint);

        log_info(&format!("🔄 [Wallet] Writing record to {}/{}", namespace, endpoint));

        let response = self
            .http_client
            .post(&url)
            .header("x-auth-token", token)
            .json(record)
            .send()
            .await
            .map_err(|e| ConnectorError::from_transport("Dataswyft write", &e))?;

        let status = response.status();
        let retry_after = retry_after_from_headers(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| ConnectorError::from_transport("Dataswyft write", &e))?;

        if !status.is_success() {
            log_upstream_api_error(&url, Some(status.as_u16()), &body);
            if status == StatusCode::UNAUTHORIZED {
                *self.token.write().await = None;
            }
            return Err(ConnectorError::from_write_status(
                &format!("Dataswyft write {}/{}", namespace, endpoint),
                status,
                retry_after,
                &body,
            ));
        }

        let record_id = serde_json::from_str::<Value>(&body)
            .map(|v| record_id_from(&v))
            .unwrap_or_else(|_| "unknown".to_string());

        log_info(&format!(
            "✅ [Wallet] Record written to {}/{} (status {}, id {})",
            namespace,
            endpoint,
            status.as_u16(),
            record_id
        ));

        Ok(record_id)
    }
}
