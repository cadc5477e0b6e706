//! End-to-end `/connect` flows with in-memory upstreams.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use zoho_dataswyft_connector::auth::app_token::encode_unsigned;
use zoho_dataswyft_connector::auth::{Credential, CredentialExchange, OAuth2Config, OAuth2State, TokenManager};
use zoho_dataswyft_connector::config::settings::{
    ConnectorSettings, DataswyftSettings, ServerSettings, Settings, ZohoSettings,
};
use zoho_dataswyft_connector::models::{CallbackPayload, ConnectParams, ErrorType};
use zoho_dataswyft_connector::services::{
    Acceptance, CallbackSender, ConnectPipeline, Contact, ContactSource, DataswyftWalletClient, PipelineConfig,
    PipelineState, RecordSink, RetryPolicy, WalletRecord,
};
use zoho_dataswyft_connector::utils::{ConnectorError, ConnectorResult};
use zoho_dataswyft_connector::{build_router, AppState};

const CALLBACK_URL: &str = "https://caller.example/callback";

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Replays scripted responses, then answers with an empty result.
#[derive(Default)]
struct ScriptedContacts {
    script: Mutex<VecDeque<ConnectorResult<Vec<Contact>>>>,
    calls: AtomicUsize,
}

impl ScriptedContacts {
    fn with(script: Vec<ConnectorResult<Vec<Contact>>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContactSource for ScriptedContacts {
    async fn search_by_email(&self, _email: &str) -> ConnectorResult<Vec<Contact>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script.lock().unwrap().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[derive(Default)]
struct MemorySink {
    writes: Mutex<Vec<(String, String, WalletRecord)>>,
}

impl MemorySink {
    fn writes(&self) -> Vec<(String, String, WalletRecord)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn write(&self, namespace: &str, endpoint: &str, record: &WalletRecord) -> ConnectorResult<String> {
        let mut writes = self.writes.lock().unwrap();
        writes.push((namespace.to_string(), endpoint.to_string(), record.clone()));
        Ok(format!("rec-{}", writes.len()))
    }
}

#[derive(Default)]
struct RecordingCallback {
    sent: Mutex<Vec<(String, CallbackPayload)>>,
    unreachable: bool,
}

impl RecordingCallback {
    fn sent(&self) -> Vec<(String, CallbackPayload)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl CallbackSender for RecordingCallback {
    async fn send(&self, url: &str, payload: &CallbackPayload) -> ConnectorResult<u16> {
        self.sent.lock().unwrap().push((url.to_string(), payload.clone()));
        if self.unreachable {
            return Err(ConnectorError::Network("connection refused".to_string()));
        }
        Ok(200)
    }
}

struct StaticExchange;

#[async_trait]
impl CredentialExchange for StaticExchange {
    async fn exchange_authorization_code(&self, _code: &str) -> ConnectorResult<Credential> {
        Ok(Credential::new("code-token".to_string(), "Bearer".to_string(), 3600, Utc::now()))
    }

    async fn refresh(&self, _refresh_token: &str) -> ConnectorResult<Credential> {
        Ok(Credential::new("refreshed".to_string(), "Bearer".to_string(), 3600, Utc::now()))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn contact(id: &str, email: &str) -> Contact {
    match json!({ "id": id, "Email": email, "First_Name": "Ana" }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn caller_token(exp_offset_secs: i64) -> String {
    encode_unsigned(&json!({
        "iss": "https://merchant.hubat.net",
        "application": "zoho-connector",
        "exp": Utc::now().timestamp() + exp_offset_secs
    }))
}

fn params(token: String, request_id: &str) -> ConnectParams {
    ConnectParams {
        token: Some(token),
        callback_url: Some(CALLBACK_URL.to_string()),
        data: Some(r#"{"email":"a@b.com"}"#.to_string()),
        request_id: Some(request_id.to_string()),
    }
}

fn pipeline_config() -> PipelineConfig {
    PipelineConfig {
        expected_application_id: Some("zoho-connector".to_string()),
        test_mode: false,
        public_base_url: "https://connector.example".to_string(),
    }
}

fn pipeline(
    contacts: Arc<ScriptedContacts>,
    sink: Arc<MemorySink>,
    callback: Arc<RecordingCallback>,
) -> Arc<ConnectPipeline> {
    Arc::new(ConnectPipeline::new(
        contacts,
        sink,
        callback,
        RetryPolicy::default(),
        pipeline_config(),
    ))
}

async fn run(pipeline: &Arc<ConnectPipeline>, params: ConnectParams) -> zoho_dataswyft_connector::services::PipelineOutcome {
    match pipeline.accept(params) {
        Acceptance::Accepted { response, task } => {
            assert_eq!(response.status, "accepted");
            task.await.expect("pipeline task panicked")
        }
        Acceptance::Redirect { location } => panic!("unexpected redirect to {}", location),
    }
}

fn failure_code(payload: &CallbackPayload) -> (ErrorType, String) {
    match payload {
        CallbackPayload::Failure { error, redirect_url, .. } => (error.code, redirect_url.clone()),
        other => panic!("expected failure payload, got {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn success_delivers_record_id() {
    let contacts = ScriptedContacts::with(vec![Ok(vec![contact("5725767000000412001", "a@b.com")])]);
    let sink = Arc::new(MemorySink::default());
    let callback = Arc::new(RecordingCallback::default());
    let pipeline = pipeline(contacts.clone(), sink.clone(), callback.clone());

    let outcome = run(&pipeline, params(caller_token(600), "req_123")).await;

    assert_eq!(outcome.state, PipelineState::CallbackSent);
    match &outcome.payload {
        CallbackPayload::Success { request_id, record_ids, .. } => {
            assert_eq!(request_id, "req_123");
            assert!(!record_ids.zoho_crm_record_id.is_empty());
        }
        other => panic!("expected success, got {:?}", other),
    }

    let sent = callback.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, CALLBACK_URL);
    assert!(sent[0].1.is_success());

    let writes = sink.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!((writes[0].0.as_str(), writes[0].1.as_str()), ("zoho-crm", "contacts"));
}

#[tokio::test]
async fn no_matching_contact_reports_email_not_found() {
    let contacts = ScriptedContacts::with(vec![Ok(Vec::new())]);
    let sink = Arc::new(MemorySink::default());
    let callback = Arc::new(RecordingCallback::default());
    let pipeline = pipeline(contacts.clone(), sink.clone(), callback.clone());

    let outcome = run(&pipeline, params(caller_token(600), "req_404")).await;

    assert_eq!(outcome.state, PipelineState::Errored);
    let (code, redirect_url) = failure_code(&outcome.payload);
    assert_eq!(code, ErrorType::EmailNotFound);
    assert_eq!(code.status_code(), 404);
    assert!(redirect_url.starts_with("https://connector.example/error?"));
    assert!(redirect_url.contains("type=EMAIL_NOT_FOUND"));
    assert!(redirect_url.contains("request_id=req_404"));

    // Not found is not retried and nothing is written
    assert_eq!(contacts.calls(), 1);
    assert!(sink.writes().is_empty());
    assert_eq!(callback.sent().len(), 1);
}

#[tokio::test]
async fn missing_callback_url_redirects_without_processing() {
    let contacts = ScriptedContacts::with(Vec::new());
    let callback = Arc::new(RecordingCallback::default());
    let pipeline = pipeline(contacts.clone(), Arc::new(MemorySink::default()), callback.clone());

    let mut incomplete = params(caller_token(600), "req_77");
    incomplete.callback_url = None;

    match pipeline.accept(incomplete) {
        Acceptance::Redirect { location } => {
            assert!(location.starts_with("/error?type=INVALID_DATA"));
            assert!(location.contains("request_id=req_77"));
        }
        Acceptance::Accepted { .. } => panic!("request without callback_url must not be accepted"),
    }

    tokio::task::yield_now().await;
    assert_eq!(contacts.calls(), 0);
    assert!(callback.sent().is_empty());
}

#[tokio::test]
async fn expired_caller_token_reports_invalid_token() {
    let contacts = ScriptedContacts::with(vec![Ok(vec![contact("1", "a@b.com")])]);
    let callback = Arc::new(RecordingCallback::default());
    let pipeline = pipeline(contacts.clone(), Arc::new(MemorySink::default()), callback.clone());

    let outcome = run(&pipeline, params(caller_token(-60), "req_exp")).await;

    assert_eq!(outcome.state, PipelineState::Errored);
    let (code, redirect_url) = failure_code(&outcome.payload);
    assert_eq!(code, ErrorType::InvalidToken);
    assert_eq!(code.status_code(), 401);
    assert!(redirect_url.contains("type=INVALID_TOKEN"));
    assert_eq!(contacts.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_until_success() {
    let contacts = ScriptedContacts::with(vec![
        Err(ConnectorError::Network("timeout".to_string())),
        Err(ConnectorError::UpstreamUnavailable("503".to_string())),
        Ok(vec![contact("1", "a@b.com")]),
    ]);
    let callback = Arc::new(RecordingCallback::default());
    let pipeline = pipeline(contacts.clone(), Arc::new(MemorySink::default()), callback.clone());

    let start = tokio::time::Instant::now();
    let outcome = run(&pipeline, params(caller_token(600), "req_retry")).await;

    assert_eq!(outcome.state, PipelineState::CallbackSent);
    assert!(outcome.payload.is_success());
    assert_eq!(contacts.calls(), 3);
    assert!(start.elapsed() >= Duration::from_millis(3000));
}

#[tokio::test]
async fn first_of_multiple_contacts_is_persisted() {
    let contacts = ScriptedContacts::with(vec![Ok(vec![
        contact("newest", "a@b.com"),
        contact("older", "a@b.com"),
    ])]);
    let sink = Arc::new(MemorySink::default());
    let pipeline = pipeline(contacts, sink.clone(), Arc::new(RecordingCallback::default()));

    let outcome = run(&pipeline, params(caller_token(600), "req_multi")).await;

    assert_eq!(outcome.state, PipelineState::CallbackSent);
    let writes = sink.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].2.data["id"], "newest");
}

#[tokio::test]
async fn test_request_ids_write_to_test_namespace() {
    let contacts = ScriptedContacts::with(vec![Ok(vec![contact("1", "a@b.com")])]);
    let sink = Arc::new(MemorySink::default());
    let pipeline = pipeline(contacts, sink.clone(), Arc::new(RecordingCallback::default()));

    run(&pipeline, params(caller_token(600), "test_req_1")).await;

    let writes = sink.writes();
    assert_eq!((writes[0].0.as_str(), writes[0].1.as_str()), ("test", "zoho-crm"));
}

#[tokio::test]
async fn unreachable_callback_does_not_fail_the_pipeline() {
    let contacts = ScriptedContacts::with(vec![Ok(vec![contact("1", "a@b.com")])]);
    let callback = Arc::new(RecordingCallback {
        unreachable: true,
        ..Default::default()
    });
    let pipeline = pipeline(contacts, Arc::new(MemorySink::default()), callback.clone());

    let outcome = run(&pipeline, params(caller_token(600), "req_cb")).await;

    assert_eq!(outcome.state, PipelineState::CallbackSent);
    // Sent exactly once, never retried
    assert_eq!(callback.sent().len(), 1);
}

#[tokio::test]
async fn wallet_not_found_reports_api_error() {
    use httpmock::prelude::*;

    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/users/access_token");
            then.status(200).json_body(json!({ "accessToken": "wallet-token" }));
        })
        .await;
    let write = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v2.6/data/zoho-crm/contacts");
            then.status(404).body("namespace missing");
        })
        .await;

    let wallet = DataswyftWalletClient::new(server.base_url(), "user", "pass", Duration::from_secs(5)).unwrap();
    let callback = Arc::new(RecordingCallback::default());
    let pipeline = Arc::new(ConnectPipeline::new(
        ScriptedContacts::with(vec![Ok(vec![contact("1", "a@b.com")])]),
        Arc::new(wallet),
        callback.clone(),
        RetryPolicy::new(1),
        pipeline_config(),
    ));

    let outcome = run(&pipeline, params(caller_token(600), "req_wallet")).await;

    assert_eq!(outcome.state, PipelineState::Errored);
    let (code, redirect_url) = failure_code(&outcome.payload);
    assert_eq!(code, ErrorType::ApiError);
    assert!(redirect_url.contains("type=API_ERROR"));
    write.assert_hits_async(1).await;
    assert_eq!(failure_code(&callback.sent()[0].1).0, ErrorType::ApiError);
}

#[tokio::test]
async fn malformed_payload_reports_invalid_data() {
    let contacts = ScriptedContacts::with(Vec::new());
    let pipeline = pipeline(contacts.clone(), Arc::new(MemorySink::default()), Arc::new(RecordingCallback::default()));

    let mut bad = params(caller_token(600), "req_data");
    bad.data = Some(r#"{"name":"no email"}"#.to_string());

    let outcome = run(&pipeline, bad).await;
    let (code, _) = failure_code(&outcome.payload);
    assert_eq!(code, ErrorType::InvalidData);
    assert_eq!(contacts.calls(), 0);
}

#[tokio::test]
async fn application_mismatch_reports_invalid_token() {
    let pipeline = pipeline(
        ScriptedContacts::with(Vec::new()),
        Arc::new(MemorySink::default()),
        Arc::new(RecordingCallback::default()),
    );
    let token = encode_unsigned(&json!({ "iss": "pda", "application": "someone-else" }));

    let outcome = run(&pipeline, params(token, "req_app")).await;
    assert_eq!(failure_code(&outcome.payload).0, ErrorType::InvalidToken);
}

// ---------------------------------------------------------------------------
// HTTP surface
// ---------------------------------------------------------------------------

fn settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 8080,
            public_base_url: "https://connector.example".to_string(),
        },
        zoho: ZohoSettings {
            client_id: "1000.TESTCLIENT".to_string(),
            client_secret: "secret".to_string(),
            accounts_url: "https://accounts.zoho.com".to_string(),
            api_domain: "https://www.zohoapis.com".to_string(),
            refresh_token: Some("1000.refresh".to_string()),
            scope: "ZohoCRM.modules.contacts.ALL".to_string(),
            redirect_uri: "https://connector.example/auth/zoho/callback".to_string(),
        },
        dataswyft: DataswyftSettings {
            api_url: "https://wallet.example".to_string(),
            username: "user".to_string(),
            password: "pass".to_string(),
        },
        connector: ConnectorSettings {
            application_id: Some("zoho-connector".to_string()),
            test_mode: false,
            http_timeout_secs: 30,
            max_attempts: 3,
        },
    }
}

fn router(callback: Arc<RecordingCallback>) -> axum::Router {
    let settings = settings();
    let oauth_config = tokio_test::assert_ok!(OAuth2Config::from_settings(&settings));
    let exchange: Arc<dyn CredentialExchange> = Arc::new(StaticExchange);
    let token_manager = Arc::new(TokenManager::new(&oauth_config, exchange.clone()));

    let pipeline = pipeline(
        ScriptedContacts::with(vec![Ok(vec![contact("1", "a@b.com")])]),
        Arc::new(MemorySink::default()),
        callback,
    );

    let app_state = Arc::new(AppState {
        settings,
        token_manager: token_manager.clone(),
        pipeline,
    });
    let oauth_state = Arc::new(OAuth2State {
        config: oauth_config,
        exchange,
        token_manager,
    });

    build_router(app_state, oauth_state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn connect_endpoint_acknowledges_immediately() {
    let app = router(Arc::new(RecordingCallback::default()));
    let uri = format!(
        "/connect?token={}&callback_url={}&data={}&request_id=req_http",
        caller_token(600),
        urlencoding::encode(CALLBACK_URL),
        urlencoding::encode(r#"{"email":"a@b.com"}"#)
    );

    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({
            "status": "accepted",
            "message": "Request received, processing started",
            "request_id": "req_http"
        })
    );
}

#[tokio::test]
async fn connect_endpoint_redirects_on_missing_parameters() {
    let callback = Arc::new(RecordingCallback::default());
    let app = router(callback.clone());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/connect?token=abc&data=%7B%7D")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()["location"].to_str().unwrap();
    assert!(location.starts_with("/error?type=INVALID_DATA"));
    assert!(location.ends_with("request_id=unknown"));
    assert!(callback.sent().is_empty());
}

#[tokio::test]
async fn error_page_uses_type_status() {
    let app = router(Arc::new(RecordingCallback::default()));

    let not_found = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/error?type=EMAIL_NOT_FOUND&message=No%20contact&request_id=req_1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

    let unknown = app
        .oneshot(Request::builder().uri("/error?type=BOGUS").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn health_and_ready() {
    let app = router(Arc::new(RecordingCallback::default()));

    let health = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(body_json(health).await["status"], "healthy");

    let ready = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(ready.status(), StatusCode::OK);
}

#[tokio::test]
async fn oauth_start_redirects_to_zoho() {
    let app = router(Arc::new(RecordingCallback::default()));

    let response = app
        .oneshot(Request::builder().uri("/auth/zoho").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()["location"].to_str().unwrap();
    assert!(location.starts_with("https://accounts.zoho.com/oauth/v2/auth?response_type=code"));
    assert!(location.contains("access_type=offline"));
}

#[tokio::test]
async fn admin_routes_require_key() {
    std::env::set_var("ADMIN_API_KEY", "admin-secret");
    let app = router(Arc::new(RecordingCallback::default()));

    let denied = app
        .clone()
        .oneshot(Request::builder().uri("/admin/token").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let cleared = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/token/clear")
                .header("X-Admin-Key", "admin-secret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(cleared.status(), StatusCode::OK);
    assert_eq!(body_json(cleared).await["success"], true);

    let info = app
        .oneshot(
            Request::builder()
                .uri("/admin/token")
                .header("X-Admin-Key", "admin-secret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(info).await;
    assert_eq!(body["has_token"], false);
    assert_eq!(body["refresh_token_configured"], true);
}
