//! Zoho CRM → Dataswyft wallet connector
//!
//! Library half of the service; `main.rs` only wires settings into these
//! modules and serves the router.

pub mod auth;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use auth::{handle_oauth_callback, start_oauth_flow, OAuth2State, TokenManager};
use services::ConnectPipeline;

/// Shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub token_manager: Arc<TokenManager>,
    pub pipeline: Arc<ConnectPipeline>,
}

pub fn build_router(app_state: Arc<AppState>, oauth_state: Arc<OAuth2State>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::ready_check))
        .route("/connect", get(handlers::handle_connect))
        .route("/error", get(handlers::handle_error_page))
        .with_state(app_state.clone());

    let admin_routes = Router::new()
        .route("/admin/token", get(handlers::token_info))
        .route("/admin/token/clear", post(handlers::clear_token_cache))
        .layer(axum_middleware::from_fn(middleware::require_admin_key))
        .with_state(app_state);

    let oauth_routes = Router::new()
        .route("/auth/zoho", get(start_oauth_flow))
        .route("/auth/zoho/callback", get(handle_oauth_callback))
        .with_state(oauth_state);

    public_routes
        .merge(admin_routes)
        .merge(oauth_routes)
        .layer(TraceLayer::new_for_http())
}
