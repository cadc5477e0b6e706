//! Callback delivery to the caller-supplied URL

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::models::CallbackPayload;
use crate::utils::{ConnectorError, ConnectorResult};

#[async_trait]
pub trait CallbackSender: Send + Sync {
    /// Posts `payload` to `url` once and returns the HTTP status.
    async fn send(&self, url: &str, payload: &CallbackPayload) -> ConnectorResult<u16>;
}

pub struct HttpCallbackSender {
    http_client: Client,
}

impl HttpCallbackSender {
    pub fn new(timeout: Duration) -> ConnectorResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConnectorError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl CallbackSender for HttpCallbackSender {
    async fn send(&self, url: &str, payload: &CallbackPayload) -> ConnectorResult<u16> {
        let response = self
            .http_client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| ConnectorError::from_transport("Callback", &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectorError::from_write_status("Callback", status, None, &body));
        }

        Ok(status.as_u16())
    }
}
