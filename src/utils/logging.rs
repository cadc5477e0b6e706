use std::time::Duration;
use tracing::{debug, error, info, warn};

pub fn log_request_received(endpoint: &str, method: &str) {
    info!("Request received: {} {}", method, endpoint);
}

pub fn log_request_processed(endpoint: &str, status: u16, duration_ms: u64) {
    info!("Request processed: {} - Status: {} - Duration: {}ms",
          endpoint, status, duration_ms);
}

pub fn log_credential_refreshed(api_domain: &str, expires_in_secs: i64) {
    info!("🔑 Zoho access token refreshed - API domain: {} - Expires in: {}s", api_domain, expires_in_secs);
}

pub fn log_credential_evicted(reason: &str) {
    info!("🗑️ Zoho access token evicted from cache: {}", reason);
}

pub fn log_retry_scheduled(operation: &str, attempt: u32, error_kind: &str, delay: Duration) {
    warn!(
        operation,
        attempt,
        error_kind,
        delay_ms = delay.as_millis() as u64,
        "⚠️ {} attempt {} failed ({}), retrying in {}ms",
        operation, attempt, error_kind, delay.as_millis()
    );
}

pub fn log_retry_exhausted(operation: &str, attempt: u32, error: &str) {
    error!(operation, attempt, "❌ {} failed after {} attempt(s): {}", operation, attempt, error);
}

pub fn log_callback_sent(callback_url: &str, status: u16) {
    info!("📤 Callback delivered to {} - Status: {}", callback_url, status);
}

pub fn log_callback_failed(callback_url: &str, error: &str) {
    error!("❌ Failed to send callback to {}: {}", callback_url, error);
}

pub fn log_upstream_api_error(endpoint: &str, status: Option<u16>, error: &str) {
    error!("Upstream API error: {} - Status: {:?} - Error: {}", endpoint, status, error);
}

pub fn log_config_loaded(env: &str) {
    info!("Configuration loaded successfully for environment: {}", env);
}

pub fn log_server_startup(port: u16) {
    info!("🚀 Zoho CRM Data Connector server starting on port {}", port);
}

pub fn log_server_ready(port: u16) {
    info!("✅ Server ready and listening on http://0.0.0.0:{}", port);
}

pub fn log_health_check() {
    debug!("Health check requested");
}

pub fn log_validation_error(field: &str, message: &str) {
    warn!("Validation error: {} - {}", field, message);
}

pub fn log_info(message: &str) {
    info!("{}", message);
}

pub fn log_error(message: &str) {
    error!("{}", message);
}

pub fn log_warning(message: &str) {
    warn!("{}", message);
}
