//! Diagnostic page shown to merchants when a request fails.

use axum::{
    extract::Query,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;

use crate::models::ErrorType;
use crate::utils::escape_html;
use crate::utils::logging::*;

#[derive(Debug, Default, Deserialize)]
pub struct ErrorPageParams {
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub message: Option<String>,
    pub request_id: Option<String>,
    pub details: Option<String>,
}

/// GET /error?type&message&request_id&details
pub async fn handle_error_page(Query(params): Query<ErrorPageParams>) -> Response {
    log_request_received("/error", "GET");

    let error_type = ErrorType::parse_or_default(params.error_type.as_deref());
    let status = StatusCode::from_u16(error_type.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (status, Html(render_error_page(error_type, &params))).into_response()
}

pub fn render_error_page(error_type: ErrorType, params: &ErrorPageParams) -> String {
    let info = error_type.page_info();

    let message = params
        .message
        .as_deref()
        .filter(|m| !m.is_empty())
        .unwrap_or(info.description);
    let request_id = params
        .request_id
        .as_deref()
        .filter(|r| !r.is_empty())
        .unwrap_or("Unknown");
    let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();

    let details_html = match params.details.as_deref().filter(|d| !d.is_empty()) {
        Some(details) => format!(
            r#"<div class="detail-item"><span class="detail-label">Details:</span><span class="detail-value">{}</span></div>"#,
            escape_html(details)
        ),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - Zoho CRM Data Connector</title>
    <style>
        * {{ margin: 0; padding: 0; box-sizing: border-box; }}
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
               background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); min-height: 100vh;
               display: flex; align-items: center; justify-content: center; padding: 20px; }}
        .error-container {{ background: white; border-radius: 16px; box-shadow: 0 20px 40px rgba(0,0,0,0.1);
                           max-width: 600px; width: 100%; padding: 40px; text-align: center; }}
        .error-icon {{ font-size: 4rem; margin-bottom: 20px; display: block; }}
        .error-title {{ color: {color}; font-size: 2rem; font-weight: 700; margin-bottom: 16px; }}
        .error-message {{ color: #4b5563; font-size: 1.1rem; line-height: 1.6; margin-bottom: 24px; }}
        .error-details {{ background: #f9fafb; border-radius: 8px; padding: 20px; margin-bottom: 24px; text-align: left; }}
        .detail-item {{ display: flex; justify-content: space-between; padding: 8px 0; border-bottom: 1px solid #e5e7eb; }}
        .detail-label {{ color: #6b7280; font-weight: 500; }}
        .detail-value {{ color: #374151; font-family: 'Monaco', 'Menlo', monospace; font-size: 0.9rem; }}
        .user-action {{ background: #eff6ff; border-left: 4px solid #3b82f6; padding: 16px; margin-bottom: 24px; text-align: left; }}
        .btn {{ padding: 12px 24px; border-radius: 8px; font-weight: 600; border: none; cursor: pointer; }}
        .btn-primary {{ background: {color}; color: white; }}
        .btn-secondary {{ background: #f3f4f6; color: #374151; border: 1px solid #d1d5db; }}
        .footer {{ margin-top: 32px; padding-top: 24px; border-top: 1px solid #e5e7eb; color: #9ca3af; font-size: 0.875rem; }}
    </style>
</head>
<body>
    <div class="error-container">
        <div class="error-icon">{icon}</div>
        <h1 class="error-title">{title}</h1>
        <p class="error-message">{message}</p>
        <div class="error-details">
            <h3>Error Details</h3>
            <div class="detail-item"><span class="detail-label">Error Code:</span><span class="detail-value">{status_code}</span></div>
            <div class="detail-item"><span class="detail-label">Type:</span><span class="detail-value">{error_type}</span></div>
            <div class="detail-item"><span class="detail-label">Request ID:</span><span class="detail-value">{request_id}</span></div>
            <div class="detail-item"><span class="detail-label">Timestamp:</span><span class="detail-value">{timestamp}</span></div>
            {details_html}
        </div>
        <div class="user-action">
            <strong>What to do next:</strong>
            <p>{user_action}</p>
        </div>
        <button class="btn btn-primary" onclick="window.history.back()">Go Back</button>
        <button class="btn btn-secondary" onclick="window.location.reload()">Try Again</button>
        <div class="footer">
            Zoho CRM Data Connector v{version}<br>
            If you continue to experience issues, please contact support with the Request ID above.
        </div>
    </div>
</body>
</html>"#,
        title = info.title,
        color = info.color,
        icon = info.icon,
        message = escape_html(message),
        status_code = info.status_code,
        error_type = error_type.as_str(),
        request_id = escape_html(request_id),
        timestamp = timestamp,
        details_html = details_html,
        user_action = info.user_action,
        version = env!("CARGO_PKG_VERSION"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_escaping() {
        let params = ErrorPageParams {
            message: Some("<script>alert(1)</script>".to_string()),
            ..Default::default()
        };
        let html = render_error_page(ErrorType::ApiError, &params);

        assert!(html.contains("Service Error"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>alert"));
        assert!(html.contains(">Unknown<"));
        assert!(!html.contains("Details:"));
    }

    #[test]
    fn test_description_used_when_message_missing() {
        let params = ErrorPageParams {
            request_id: Some("req_1".to_string()),
            details: Some("not_found".to_string()),
            ..Default::default()
        };
        let html = render_error_page(ErrorType::EmailNotFound, &params);

        assert!(html.contains("could not be found in Zoho CRM"));
        assert!(html.contains("req_1"));
        assert!(html.contains("Details:"));
        assert!(html.contains(">404<"));
    }
}
