//! Connect Pipeline
//!
//! Per-request state machine behind `GET /connect`:
//!
//! ```text
//! Received → ValidatingToken → Fetching → Persisting → CallbackSent
//!                    └───────────┴───────────┴──────→ Errored
//! ```
//!
//! The synchronous caller only sees the acknowledgment (or the redirect for
//! missing parameters); outcomes travel through the callback.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::callback::CallbackSender;
use super::data_mapper::{to_wallet_record, Contact};
use super::retry::RetryPolicy;
use super::wallet::RecordSink;
use super::zoho_crm::ContactSource;
use crate::auth::validate_app_token;
use crate::config::Settings;
use crate::models::{
    error_page_path, AcceptedResponse, CallbackPayload, ConnectParams, ConnectRequest, ErrorType,
    MISSING_PARAMS_MESSAGE,
};
use crate::utils::logging::*;
use crate::utils::{ConnectorError, ConnectorResult};

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    ValidatingToken,
    Fetching,
    Persisting,
    CallbackSent,
    Errored,
}

/// Final state and the payload that was delivered (or attempted).
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub state: PipelineState,
    pub payload: CallbackPayload,
}

/// Result of the synchronous half of `/connect`.
pub enum Acceptance {
    Accepted {
        response: AcceptedResponse,
        task: JoinHandle<PipelineOutcome>,
    },
    /// Missing parameters: nothing was spawned
    Redirect { location: String },
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Expected `application` claim; any application is accepted when `None`
    pub expected_application_id: Option<String>,
    pub test_mode: bool,
    /// Prefix for diagnostic page links sent in failure callbacks
    pub public_base_url: String,
}

impl PipelineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            expected_application_id: settings
                .connector
                .application_id
                .clone()
                .filter(|s| !s.trim().is_empty()),
            test_mode: settings.connector.test_mode,
            public_base_url: settings.server.public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

pub struct ConnectPipeline {
    contacts: Arc<dyn ContactSource>,
    sink: Arc<dyn RecordSink>,
    callback: Arc<dyn CallbackSender>,
    retry: RetryPolicy,
    config: PipelineConfig,
}

/// Extracts and checks the `email` field of the request payload.
pub fn parse_email(data: &str) -> ConnectorResult<String> {
    let value: Value = serde_json::from_str(data)
        .map_err(|_| ConnectorError::InvalidData("Invalid JSON data format".to_string()))?;

    let email = value
        .as_object()
        .ok_or_else(|| ConnectorError::InvalidData("Data must be a JSON object".to_string()))?
        .get("email")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ConnectorError::InvalidData("Email not found in data object".to_string()))?;

    if !EMAIL_REGEX.is_match(email) {
        return Err(ConnectorError::InvalidData("Invalid email format provided".to_string()));
    }

    Ok(email.to_string())
}

/// Picks the first match; Zoho returns the most recent record first.
pub fn select_contact(contacts: Vec<Contact>, email: &str) -> ConnectorResult<Contact> {
    if contacts.len() > 1 {
        log_warning(&format!(
            "⚠️  [Pipeline] {} contacts match {}, using the first one",
            contacts.len(),
            email
        ));
    }

    contacts
        .into_iter()
        .next()
        .ok_or_else(|| ConnectorError::NotFound(format!("No contact found with email {}", email)))
}

impl ConnectPipeline {
    pub fn new(
        contacts: Arc<dyn ContactSource>,
        sink: Arc<dyn RecordSink>,
        callback: Arc<dyn CallbackSender>,
        retry: RetryPolicy,
        config: PipelineConfig,
    ) -> Self {
        Self {
            contacts,
            sink,
            callback,
            retry,
            config,
        }
    }

    /// Synchronous half of `/connect`: validate parameters, spawn processing.
    pub fn accept(self: &Arc<Self>, params: ConnectParams) -> Acceptance {
        let request = match params.into_request() {
            Ok(request) => request,
            Err(missing) => {
                log_validation_error("connect", MISSING_PARAMS_MESSAGE);
                return Acceptance::Redirect {
                    location: error_page_path(ErrorType::InvalidData, MISSING_PARAMS_MESSAGE, &missing.request_id, None),
                };
            }
        };

        let response = AcceptedResponse::new(request.request_id.clone());
        let span = tracing::info_span!("connect", request_id = %request.request_id);
        let pipeline = Arc::clone(self);
        let task = tokio::spawn(async move { pipeline.process(request).await }.instrument(span));

        Acceptance::Accepted { response, task }
    }

    /// Runs the state machine to completion and delivers the callback.
    pub async fn process(&self, request: ConnectRequest) -> PipelineOutcome {
        let mut state = PipelineState::Received;

        let (payload, final_state) = match self.execute(&request, &mut state).await {
            Ok(record_id) => (
                CallbackPayload::success(&request.request_id, record_id),
                PipelineState::CallbackSent,
            ),
            Err(error) => {
                log_error(&format!(
                    "❌ [Pipeline] {} failed in {:?}: {}",
                    request.request_id, state, error
                ));
                (self.failure_payload(&request.request_id, &error), PipelineState::Errored)
            }
        };

        self.deliver(&request.callback_url, &payload).await;
        self.transition(&mut state, final_state, &request.request_id);

        PipelineOutcome { state, payload }
    }

    async fn execute(&self, request: &ConnectRequest, state: &mut PipelineState) -> ConnectorResult<String> {
        let request_id = request.request_id.as_str();

        // 1. Caller token
        self.transition(state, PipelineState::ValidatingToken, request_id);
        let claims = validate_app_token(&request.token, self.config.expected_application_id.as_deref())?;
        log_info(&format!(
            "🔐 [Pipeline] Token accepted (application {}, issuer {})",
            claims.application, claims.issuer
        ));

        // 2. Payload and contact lookup
        let email = parse_email(&request.data)?;
        self.transition(state, PipelineState::Fetching, request_id);

        let contacts = self.contacts.as_ref();
        let email_ref = email.as_str();
        let found = self
            .retry
            .run("search_contact", move |_| contacts.search_by_email(email_ref))
            .await?;
        let contact = select_contact(found, &email)?;

        // 3. Persist
        self.transition(state, PipelineState::Persisting, request_id);
        let record = to_wallet_record(&contact);
        let (namespace, endpoint) = self.namespace_for(request_id);

        let sink = self.sink.as_ref();
        let record_ref = &record;
        let record_id = self
            .retry
            .run("write_record", move |_| sink.write(namespace, endpoint, record_ref))
            .await?;

        Ok(record_id)
    }

    /// `test/zoho-crm` for test traffic, `zoho-crm/contacts` otherwise.
    pub fn namespace_for(&self, request_id: &str) -> (&'static str, &'static str) {
        if self.config.test_mode || request_id.contains("test_") {
            ("test", "zoho-crm")
        } else {
            ("zoho-crm", "contacts")
        }
    }

    fn failure_payload(&self, request_id: &str, error: &ConnectorError) -> CallbackPayload {
        let error_type = error.error_type();
        let message = error.to_string();
        let url = format!(
            "{}{}",
            self.config.public_base_url,
            error_page_path(error_type, &message, request_id, Some(error.kind()))
        );

        CallbackPayload::failure(request_id, error_type, &message, url)
    }

    async fn deliver(&self, callback_url: &str, payload: &CallbackPayload) {
        match self.callback.send(callback_url, payload).await {
            Ok(status) => log_callback_sent(callback_url, status),
            Err(e) => log_callback_failed(callback_url, &e.to_string()),
        }
    }

    fn transition(&self, state: &mut PipelineState, next: PipelineState, request_id: &str) {
        tracing::debug!(request_id, from = ?state, to = ?next, "pipeline transition");
        *state = next;
    }
}
