//! Token Manager
//!
//! Process-wide store for the Zoho access credential.
//!
//! - A usable cached credential is returned without I/O.
//! - Concurrent callers that find no usable credential share one refresh:
//!   the first caller registers an in-flight marker (a `watch` channel) and
//!   spawns the exchange, everyone else subscribes to the same outcome.
//! - A successful refresh schedules an eviction task at `expires_at`; the
//!   task is aborted on replacement, `clear_cache`, `shutdown` and drop.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::client::CredentialExchange;
use super::credential::Credential;
use super::OAuth2Config;
use crate::utils::logging::*;
use crate::utils::{mask_secret, ConnectorError, ConnectorResult};

/// Single credential slot; the store is not multi-tenant.
const CACHE_KEY: &str = "zoho_crm_access_token";

type RefreshOutcome = Option<ConnectorResult<Credential>>;

struct StoreState {
    credential: Option<Credential>,
    refresh_token: Option<String>,
    in_flight: HashMap<String, watch::Receiver<RefreshOutcome>>,
    eviction: Option<JoinHandle<()>>,
}

impl StoreState {
    fn cancel_eviction(&mut self) {
        if let Some(handle) = self.eviction.take() {
            handle.abort();
        }
    }
}

/// Removes the in-flight marker when the refresh task ends, including by panic or abort.
struct InFlightMarker<'a> {
    inner: &'a Inner,
}

impl Drop for InFlightMarker<'_> {
    fn drop(&mut self) {
        self.inner.lock_state().in_flight.remove(CACHE_KEY);
    }
}

struct Inner {
    state: Mutex<StoreState>,
    exchange: Arc<dyn CredentialExchange>,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_refresh(self: Arc<Self>, refresh_token: String, tx: watch::Sender<RefreshOutcome>) {
        let marker = InFlightMarker { inner: &self };

        let result = self
            .exchange
            .refresh(&refresh_token)
            .await
            .map(|mut credential| {
                // Zoho does not echo the refresh token on the refresh grant
                credential.refresh_token.get_or_insert(refresh_token);
                credential
            });

        {
            let mut state = self.lock_state();
            match &result {
                Ok(credential) => {
                    state.credential = Some(credential.clone());
                    self.schedule_eviction(&mut state, credential);
                    log_credential_refreshed(
                        credential.api_domain.as_deref().unwrap_or("-"),
                        (credential.expires_at - credential.issued_at).num_seconds(),
                    );
                }
                Err(e) => {
                    state.credential = None;
                    state.cancel_eviction();
                    log_error(&format!("❌ [TokenManager] Refresh failed: {}", e));
                }
            }
        }

        drop(marker);
        tx.send_replace(Some(result));
    }

    fn schedule_eviction(self: &Arc<Self>, state: &mut StoreState, credential: &Credential) {
        state.cancel_eviction();

        let weak: Weak<Inner> = Arc::downgrade(self);
        let access_token = credential.access_token.clone();
        let wait = (credential.expires_at - Utc::now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);

        state.eviction = Some(tokio::spawn(async move {
            tokio::time::sleep(wait).await;

            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut state = inner.lock_state();
            let is_same = state
                .credential
                .as_ref()
                .is_some_and(|c| c.access_token == access_token);
            if is_same {
                state.credential = None;
                log_credential_evicted("expired");
            }
        }));
    }
}

/// Snapshot exposed on the admin endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct TokenInfo {
    pub has_token: bool,
    pub expires_at: DateTime<Utc>,
    pub api_domain: Option<String>,
    pub is_valid: bool,
}

/// Credential store for outbound Zoho calls
pub struct TokenManager {
    inner: Arc<Inner>,
}

impl TokenManager {
    pub fn new(config: &OAuth2Config, exchange: Arc<dyn CredentialExchange>) -> Self {
        let refresh_token = config.usable_refresh_token().map(str::to_string);
        if refresh_token.is_none() {
            log_warning("⚠️  [TokenManager] No refresh token configured. Run /auth/zoho to authorize.");
        }

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(StoreState {
                    credential: None,
                    refresh_token,
                    in_flight: HashMap::new(),
                    eviction: None,
                }),
                exchange,
            }),
        }
    }

    /// Returns a usable credential, refreshing it at most once across concurrent callers.
    ///
    /// # Errors
    /// - `ConnectorError::Config` when no refresh token is configured
    /// - whatever the exchange returned, identically for every attached caller
    pub async fn get_valid_credential(&self) -> ConnectorResult<Credential> {
        let mut rx = {
            let mut state = self.inner.lock_state();

            // 1. Cached credential still outside the safety margin
            if let Some(credential) = state.credential.as_ref().filter(|c| c.is_usable()) {
                return Ok(credential.clone());
            }

            // 2. Attach to a refresh that is already running
            if let Some(rx) = state.in_flight.get(CACHE_KEY) {
                log_info("⏳ [TokenManager] Refresh in flight, waiting for its outcome");
                rx.clone()
            } else {
                // 3. Become the leader
                let refresh_token = state.refresh_token.clone().ok_or_else(|| {
                    log_error("❌ [TokenManager] Refresh token missing or placeholder");
                    ConnectorError::Config(
                        "Zoho refresh token not configured. Run /auth/zoho to authorize.".to_string(),
                    )
                })?;

                log_info(&format!(
                    "🔄 [TokenManager] No usable credential, refreshing with {}",
                    mask_secret(&refresh_token)
                ));

                let (tx, rx) = watch::channel(None);
                state.in_flight.insert(CACHE_KEY.to_string(), rx.clone());
                tokio::spawn(Arc::clone(&self.inner).run_refresh(refresh_token, tx));
                rx
            }
        };

        let outcome = rx.wait_for(Option::is_some).await.map(|o| o.clone());
        match outcome {
            Ok(Some(result)) => result,
            _ => Err(ConnectorError::UpstreamUnavailable(
                "Credential refresh was abandoned".to_string(),
            )),
        }
    }

    /// `Authorization` header value built from a valid credential.
    pub async fn authorization_header(&self) -> ConnectorResult<String> {
        Ok(self.get_valid_credential().await?.authorization_header())
    }

    /// Installs a credential obtained outside the refresh path (authorization-code flow).
    ///
    /// A usable refresh token carried by the credential replaces the configured one.
    pub fn install(&self, credential: Credential) {
        let mut state = self.inner.lock_state();

        if let Some(refresh_token) = credential.refresh_token.as_deref().filter(|t| !t.trim().is_empty()) {
            state.refresh_token = Some(refresh_token.to_string());
        }

        self.inner.schedule_eviction(&mut state, &credential);
        state.credential = Some(credential);
        log_info("💾 [TokenManager] Credential installed");
    }

    /// Drops the cached credential; a refresh already in flight still completes.
    pub fn clear_cache(&self) {
        let mut state = self.inner.lock_state();
        state.credential = None;
        state.cancel_eviction();
        log_credential_evicted("cache cleared");
    }

    pub fn token_info(&self) -> Option<TokenInfo> {
        let state = self.inner.lock_state();
        state.credential.as_ref().map(|c| TokenInfo {
            has_token: true,
            expires_at: c.expires_at,
            api_domain: c.api_domain.clone(),
            is_valid: c.is_usable(),
        })
    }

    /// Whether a refresh can be attempted at all.
    pub fn has_refresh_token(&self) -> bool {
        self.inner.lock_state().refresh_token.is_some()
    }

    /// Cancels the pending eviction task.
    pub fn shutdown(&self) {
        self.inner.lock_state().cancel_eviction();
        log_info("🛑 [TokenManager] Eviction task cancelled");
    }
}

impl Drop for TokenManager {
    fn drop(&mut self) {
        self.inner.lock_state().cancel_eviction();
    }
}
