//! Provider-invoked webhooks: the voice menu, the gathered digit, and the
//! call lifecycle status callback.
//!
//! Twilio is on the other end of these, waiting with its own timeout, so
//! every handler answers quickly and never surfaces an error: the worst
//! case is a TwiML document that ends the call politely.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
    Form, Router,
};
use http::header::CONTENT_TYPE;
use http::StatusCode;
use serde::Deserialize;

use crate::tracking::StatusUpdate;
use crate::AppState;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/voice", get(voice_prompt).post(voice_prompt))
        .route("/voice/handle-input", post(handle_input))
        .route("/status", post(status_callback))
        .with_state(app_state)
}

/// Query parameters every menu URL round-trips through Twilio.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MenuQuery {
    resident_name: Option<String>,
    visitor_name: Option<String>,
    visit_id: Option<String>,
}

/// Form fields Twilio posts when the gather completes.
#[derive(Deserialize)]
struct DigitForm {
    #[serde(rename = "Digits")]
    digits: Option<String>,
    #[serde(rename = "CallSid")]
    call_sid: Option<String>,
}

/// Form fields of a call status callback.
#[derive(Deserialize)]
struct StatusForm {
    #[serde(rename = "CallSid")]
    call_sid: String,
    #[serde(rename = "CallStatus")]
    call_status: String,
    #[serde(rename = "CallDuration")]
    call_duration: Option<String>,
    #[serde(rename = "AnsweredBy")]
    answered_by: Option<String>,
    #[serde(rename = "From")]
    from: Option<String>,
    #[serde(rename = "To")]
    to: Option<String>,
}

async fn voice_prompt(
    State(state): State<AppState>,
    Query(query): Query<MenuQuery>,
) -> impl IntoResponse {
    let twiml = state.calls.voice_prompt(
        query.resident_name.as_deref().unwrap_or_default(),
        query.visitor_name.as_deref().unwrap_or_default(),
        query.visit_id.as_deref().unwrap_or_default(),
    );
    xml(twiml)
}

async fn handle_input(
    State(state): State<AppState>,
    Query(query): Query<MenuQuery>,
    Form(form): Form<DigitForm>,
) -> impl IntoResponse {
    tracing::info!(
        visit_id = ?query.visit_id,
        call_sid = ?form.call_sid,
        digits = ?form.digits,
        "digit input received"
    );

    let twiml = state
        .calls
        .handle_digit(
            form.digits.as_deref().unwrap_or_default(),
            query.resident_name.as_deref().unwrap_or_default(),
            query.visitor_name.as_deref().unwrap_or_default(),
            query.visit_id.as_deref().unwrap_or_default(),
            form.call_sid.as_deref(),
        )
        .await;
    xml(twiml)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusQuery {
    visit_id: Option<String>,
}

async fn status_callback(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
    Form(form): Form<StatusForm>,
) -> impl IntoResponse {
    tracing::info!(
        call_sid = %form.call_sid,
        call_status = %form.call_status,
        visit_id = ?query.visit_id,
        "call status callback"
    );

    state.tracking.update_status(
        &form.call_sid,
        &form.call_status,
        StatusUpdate {
            visit_id: query.visit_id.as_deref(),
            duration: form.call_duration.as_deref(),
            answered_by: form.answered_by.as_deref(),
            from: form.from.as_deref(),
            to: form.to.as_deref(),
        },
    );
    StatusCode::OK
}

fn xml(twiml: String) -> impl IntoResponse {
    ([(CONTENT_TYPE, "text/xml; charset=utf-8")], twiml)
}
