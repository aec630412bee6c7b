//! JSON report of the most recent cycle.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tracing::{debug, instrument};

use crate::state::{LastCycle, SharedState};

/// Handler for the /report endpoint.
#[instrument(skip(state))]
pub async fn report_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /report request");

    match state.last_cycle.read().as_deref() {
        Ok(Some(LastCycle::Ok(report))) => (StatusCode::OK, Json(json!(report))),
        Ok(Some(LastCycle::Failed(e))) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": e })),
        ),
        Ok(None) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "no cycle completed yet" })),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "state unavailable" })),
        ),
    }
}
