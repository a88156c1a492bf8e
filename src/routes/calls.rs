//! Call-level endpoints: direct outbound dialing (operator use) and
//! read-only lookups into the Call Tracking Index.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use http::StatusCode;
use serde::Deserialize;

use crate::response::{ApiResponse, ServiceError};
use crate::AppState;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", post(start_direct_call))
        .route("/visit/:visit_id", get(get_by_visit))
        .route("/:call_sid", get(get_by_call_sid))
        .with_state(app_state)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DirectCallRequest {
    to: String,
    resident_name: Option<String>,
    visitor_name: Option<String>,
    visit_id: Option<String>,
}

/// Dial a number directly, without an access-request row behind it.
async fn start_direct_call(
    State(state): State<AppState>,
    Json(body): Json<DirectCallRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    tracing::info!(to = %body.to, visit_id = ?body.visit_id, "direct call requested");

    let started = state
        .calls
        .start_call(
            &body.to,
            body.resident_name.as_deref().unwrap_or_default(),
            body.visitor_name.as_deref().unwrap_or_default(),
            body.visit_id.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::ok("Call started", started))))
}

async fn get_by_call_sid(
    State(state): State<AppState>,
    Path(call_sid): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = state
        .tracking
        .by_call_sid(&call_sid)
        .ok_or(ServiceError::CallNotFound(call_sid))?;
    Ok((StatusCode::OK, Json(ApiResponse::ok("Call found", record))))
}

async fn get_by_visit(
    State(state): State<AppState>,
    Path(visit_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = state
        .tracking
        .by_visit_id(&visit_id)
        .ok_or(ServiceError::VisitNotFound(visit_id))?;
    Ok((StatusCode::OK, Json(ApiResponse::ok("Call found", record))))
}
