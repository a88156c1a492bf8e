//! Access-request endpoints: create pending, start the authorization call,
//! receive decisions, serve the polling view.
//!
//! Handlers open one connection each, build the service around it, and map
//! the result into the response envelope.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use http::StatusCode;
use serde::Deserialize;

use crate::access::AccessService;
use crate::db::establish_connection;
use crate::response::{ApiResponse, ServiceError};
use crate::store::PgAccessStore;
use crate::AppState;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", post(create_access))
        .route("/decision", post(apply_decision))
        .route("/:id", get(get_access))
        .route("/:id/call", post(start_call))
        .route("/:id/status", get(get_status))
        .with_state(app_state)
}

fn service() -> AccessService<PgAccessStore> {
    AccessService::new(PgAccessStore::new(establish_connection()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAccessRequest {
    housing_unit_id: i32,
    reason: String,
}

async fn create_access(
    Json(body): Json<CreateAccessRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    tracing::info!(
        housing_unit_id = body.housing_unit_id,
        reason = %body.reason,
        "create access request"
    );

    let created = service().create(body.housing_unit_id, &body.reason)?;
    tracing::info!(request_id = created.request_id, "access request created");
    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok("Access request created in pending state", created)),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartCallRequest {
    visitor_name: Option<String>,
}

async fn start_call(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    body: Option<Json<StartCallRequest>>,
) -> Result<impl IntoResponse, ServiceError> {
    let visitor_name = body.as_ref().and_then(|Json(b)| b.visitor_name.as_deref());
    tracing::info!(request_id = id, visitor_name, "start authorization call");

    let started = service()
        .start_authorization_call(id, visitor_name, &state.calls)
        .await?;
    tracing::info!(request_id = id, call_sid = %started.call_sid, "authorization call started");
    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok("Authorization call started", started)),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DecisionRequest {
    decision: String,
    visit_id: String,
    digit: Option<String>,
    call_sid: Option<String>,
}

/// The decision endpoint. Both the digit webhook's notifier and direct
/// clients post here; duplicate deliveries overwrite rather than fail.
async fn apply_decision(
    Json(body): Json<DecisionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    tracing::info!(
        decision = %body.decision,
        visit_id = %body.visit_id,
        call_sid = ?body.call_sid,
        digit = ?body.digit,
        "apply decision"
    );

    let applied = service().apply_decision(
        &body.decision,
        &body.visit_id,
        body.digit.as_deref(),
        body.call_sid.as_deref(),
    )?;
    tracing::info!(request_id = applied.request_id, outcome = %applied.outcome, "decision applied");
    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok("Decision applied to access request", applied)),
    ))
}

async fn get_status(Path(id): Path<i32>) -> Result<impl IntoResponse, ServiceError> {
    let status = service().polling_status(id)?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok("Access request status", status)),
    ))
}

async fn get_access(Path(id): Path<i32>) -> Result<impl IntoResponse, ServiceError> {
    let row = service().get_by_id(id)?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok("Access request found", row)),
    ))
}
