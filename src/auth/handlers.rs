//! OAuth2 HTTP Handlers
//!
//! One-time authorization-code flow used to obtain the long-lived refresh token.

use axum::{
    extract::{Query, State},
    response::{Html, Redirect},
};
use serde::Deserialize;
use std::sync::Arc;

use super::client::CredentialExchange;
use super::{OAuth2Config, TokenManager};
use crate::utils::logging::*;
use crate::utils::{escape_html, mask_secret, AppError, AppResult};

/// Parameters Zoho appends to the redirect URI
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackParams {
    code: Option<String>,
    error: Option<String>,
}

/// Shared state for the OAuth2 handlers
pub struct OAuth2State {
    pub config: OAuth2Config,
    pub exchange: Arc<dyn CredentialExchange>,
    pub token_manager: Arc<TokenManager>,
}

/// GET /auth/zoho
///
/// Redirects the operator to the Zoho consent screen.
pub async fn start_oauth_flow(State(oauth_state): State<Arc<OAuth2State>>) -> Redirect {
    log_info("🚀 [OAuth2] Starting authorization flow...");

    let state = uuid::Uuid::new_v4().to_string();
    let auth_url = oauth_state.config.authorization_url(&state);

    log_info(&format!("↗️  [OAuth2] Redirecting to: {}", auth_url));

    Redirect::to(&auth_url)
}

/// GET /auth/zoho/callback?code=XXX
///
/// Exchanges the code (valid for about 3 minutes), installs the credential and
/// shows the refresh token so it can be persisted in `ZOHO_CRM_REFRESH_TOKEN`.
pub async fn handle_oauth_callback(
    State(oauth_state): State<Arc<OAuth2State>>,
    Query(params): Query<OAuthCallbackParams>,
) -> AppResult<Html<String>> {
    log_info("📥 [OAuth2] Callback received");

    if let Some(error) = params.error {
        log_error(&format!("❌ [OAuth2] Authorization error: {}", error));
        return Ok(render_error_page(&error));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::ValidationError("Missing code parameter".to_string()))?;

    log_info(&format!("🔑 [OAuth2] Code received: {}", mask_secret(&code)));

    let credential = match oauth_state.exchange.exchange_authorization_code(&code).await {
        Ok(credential) => credential,
        Err(e) => {
            log_error(&format!("❌ [OAuth2] Failed to exchange code: {}", e));
            return Ok(render_error_page(&e.to_string()));
        }
    };

    let refresh_token = credential.refresh_token.clone();
    oauth_state.token_manager.install(credential);

    Ok(render_success_page(refresh_token.as_deref()))
}

fn render_success_page(refresh_token: Option<&str>) -> Html<String> {
    let token_html = match refresh_token {
        Some(token) => format!(
            r#"
                <div class="token-box">
                    <h3>🔑 Refresh Token</h3>
                    <p>Set it as <code>ZOHO_CRM_REFRESH_TOKEN</code> so it survives restarts:</p>
                    <textarea id="token" rows="3" readonly>{}</textarea>
                    <button id="copyBtn" onclick="copyToken()">📋 Copy Token</button>
                </div>
            "#,
            escape_html(token)
        ),
        None => r#"
                <div class="warning">
                    <p>Zoho did not return a refresh token. Revoke the previous grant and authorize again with <code>prompt=consent</code>.</p>
                </div>
            "#
        .to_string(),
    };

    Html(format!(
        r#"
        <!DOCTYPE html>
        <html>
        <head>
            <title>Zoho OAuth - Success</title>
            <meta charset="UTF-8">
            <style>
                body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Arial, sans-serif;
                       max-width: 900px; margin: 50px auto; padding: 20px; background: #f5f5f5; }}
                .container {{ background: white; padding: 30px; border-radius: 12px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }}
                .success {{ background: #d4edda; border: 2px solid #28a745; padding: 20px; border-radius: 8px; margin-bottom: 20px; }}
                .warning {{ background: #fff3cd; border: 2px solid #ffc107; padding: 20px; border-radius: 8px; }}
                .token-box {{ background: #fff3cd; padding: 20px; border: 2px solid #ffc107; border-radius: 8px; margin: 20px 0; }}
                textarea {{ width: 100%; padding: 12px; font-family: 'Courier New', monospace;
                           font-size: 11px; border: 1px solid #ddd; border-radius: 4px; resize: vertical; }}
                button {{ background: #28a745; color: white; padding: 12px 24px; border: none;
                         border-radius: 6px; cursor: pointer; font-size: 14px; font-weight: bold; }}
                h1 {{ color: #28a745; margin-top: 0; }}
            </style>
            <script>
                function copyToken() {{
                    const textarea = document.getElementById('token');
                    textarea.select();
                    navigator.clipboard.writeText(textarea.value);
                    document.getElementById('copyBtn').textContent = '✅ Copied!';
                }}
            </script>
        </head>
        <body>
            <div class="container">
                <div class="success">
                    <h1>✅ Zoho CRM Authorization Complete</h1>
                    <p>The connector is using the new credential from now on.</p>
                </div>
                {}
            </div>
        </body>
        </html>
        "#,
        token_html
    ))
}

fn render_error_page(error: &str) -> Html<String> {
    Html(format!(
        r#"
        <!DOCTYPE html>
        <html>
        <head>
            <title>Zoho OAuth - Error</title>
            <meta charset="UTF-8">
            <style>
                body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Arial, sans-serif;
                       max-width: 600px; margin: 50px auto; padding: 20px; background: #f5f5f5; }}
                .error {{ background: #f8d7da; border: 2px solid #dc3545; padding: 20px; border-radius: 8px; }}
                h1 {{ color: #721c24; margin-top: 0; }}
            </style>
        </head>
        <body>
            <div class="error">
                <h1>❌ Authorization Error</h1>
                <p><strong>Error:</strong> {}</p>
                <p>Authorization codes expire after about 3 minutes.</p>
                <p><a href="/auth/zoho">← Try again</a></p>
            </div>
        </body>
        </html>
        "#,
        escape_html(error)
    ))
}
