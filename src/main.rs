//! Zoho CRM → Dataswyft connector
//!
//! - `/connect` acknowledges immediately and processes on a background task
//! - Zoho access tokens are refreshed on demand and cached in memory
//! - results reach the caller through its callback URL

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use zoho_dataswyft_connector::{
    auth::{CredentialExchange, OAuth2Client, OAuth2Config, OAuth2State, TokenManager},
    build_router,
    config::Settings,
    services::{
        ConnectPipeline, DataswyftWalletClient, HttpCallbackSender, PipelineConfig, RetryPolicy,
        ZohoCrmClient,
    },
    utils::logging::*,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env when present; Cloud Run injects variables directly
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if dotenv_loaded {
        tracing::info!("✅ .env file loaded");
    }

    let settings = Settings::new().context("Failed to load settings")?;
    log_config_loaded(&std::env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string()));

    let timeout = Duration::from_secs(settings.connector.http_timeout_secs);

    // 1. Zoho OAuth2 + credential store
    let oauth_config = OAuth2Config::from_settings(&settings).map_err(anyhow::Error::msg)?;
    let exchange: Arc<dyn CredentialExchange> = Arc::new(OAuth2Client::new(oauth_config.clone(), timeout)?);
    let token_manager = Arc::new(TokenManager::new(&oauth_config, exchange.clone()));

    // 2. Upstream clients
    let contacts = Arc::new(ZohoCrmClient::new(
        token_manager.clone(),
        oauth_config.default_api_domain.clone(),
        timeout,
    )?);
    let wallet = Arc::new(DataswyftWalletClient::new(
        settings.dataswyft.api_url.clone(),
        settings.dataswyft.username.clone(),
        settings.dataswyft.password.clone(),
        timeout,
    )?);
    let callback = Arc::new(HttpCallbackSender::new(timeout)?);

    // 3. Pipeline
    let pipeline = Arc::new(ConnectPipeline::new(
        contacts,
        wallet,
        callback,
        RetryPolicy::new(settings.connector.max_attempts),
        PipelineConfig::from_settings(&settings),
    ));

    let app_state = Arc::new(AppState {
        settings: settings.clone(),
        token_manager: token_manager.clone(),
        pipeline,
    });
    let oauth_state = Arc::new(OAuth2State {
        config: oauth_config,
        exchange,
        token_manager: token_manager.clone(),
    });

    let app = build_router(app_state, oauth_state);

    let port = settings.listen_port();
    let listener = TcpListener::bind(format!("{}:{}", settings.server.host, port)).await?;

    log_server_startup(port);
    log_info("📋 Endpoints: GET /connect, GET /error, GET /health, GET /ready, GET /auth/zoho");
    log_server_ready(port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    token_manager.shutdown();
    log_info("🛑 Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log_error(&format!("Failed to install Ctrl+C handler: {}", e));
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log_error(&format!("Failed to install SIGTERM handler: {}", e));
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log_info("🛑 Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            log_info("🛑 Received SIGTERM, shutting down gracefully...");
        }
    }
}
