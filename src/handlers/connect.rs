use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Redirect, Response},
};
use std::sync::Arc;
use std::time::Instant;

use crate::models::ConnectParams;
use crate::services::Acceptance;
use crate::utils::logging::*;
use crate::AppState;

/// GET /connect?token&callback_url&data&request_id
///
/// Acknowledges immediately; the contact lookup and callback run on their own task.
/// Missing parameters redirect (303) to the diagnostic page instead.
pub async fn handle_connect(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ConnectParams>,
) -> Response {
    let start = Instant::now();
    log_request_received("/connect", "GET");

    let response = match state.pipeline.accept(params) {
        Acceptance::Accepted { response, .. } => {
            log_info(&format!("📥 [Connect] Request {} accepted", response.request_id));
            Json(response).into_response()
        }
        Acceptance::Redirect { location } => {
            log_warning(&format!("↩️  [Connect] Missing parameters, redirecting to {}", location));
            Redirect::to(&location).into_response()
        }
    };

    log_request_processed("/connect", response.status().as_u16(), start.elapsed().as_millis() as u64);
    response
}
