//! JSON envelope shared by every API endpoint and the error taxonomy behind
//! it.
//!
//! Every operation answers `{success, message, data?}` or
//! `{success, message, error: {code, message, details?}}`. Clients branch on
//! `error.code`, never on the message text.

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::access::{StoreError, ALLOWED_KINDS};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: &str, data: T) -> Self {
        ApiResponse {
            success: true,
            message: message.to_string(),
            data: Some(data),
            error: None,
        }
    }
}

/// Failure of any public operation, carrying its stable wire code.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("reason is required")]
    MissingReason,

    #[error("destination number is required")]
    MissingDestination,

    #[error("access kind is not allowed")]
    InvalidKind(String),

    #[error("missing environment configuration")]
    MissingConfig(Vec<&'static str>),

    #[error("error creating call")]
    Call(String),

    #[error("no resident found for housing unit")]
    ResidentNotFound(i32),

    #[error("resident has no phone number configured")]
    ResidentPhoneMissing(i32),

    #[error("access request does not exist")]
    NotFound(i32),

    #[error("no access request found to update")]
    AccessNotFound(i32),

    #[error("call is not tracked")]
    CallNotFound(String),

    #[error("no call tracked for visit")]
    VisitNotFound(String),

    #[error("invalid decision")]
    InvalidDecision(String),

    #[error("invalid visit id")]
    InvalidVisitId(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::MissingReason => "MISSING_REASON",
            ServiceError::MissingDestination => "MISSING_DESTINATION",
            ServiceError::InvalidKind(_) => "INVALID_KIND",
            ServiceError::MissingConfig(_) => "MISSING_CONFIG",
            ServiceError::Call(_) => "CALL_ERROR",
            ServiceError::ResidentNotFound(_) => "RESIDENT_NOT_FOUND",
            ServiceError::ResidentPhoneMissing(_) => "RESIDENT_PHONE_MISSING",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::AccessNotFound(_) => "ACCESS_NOT_FOUND",
            ServiceError::CallNotFound(_) => "CALL_NOT_FOUND",
            ServiceError::VisitNotFound(_) => "VISIT_NOT_FOUND",
            ServiceError::InvalidDecision(_) => "INVALID_DECISION",
            ServiceError::InvalidVisitId(_) => "INVALID_VISIT_ID",
            ServiceError::Store(_) => "STORE_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::MissingReason
            | ServiceError::MissingDestination
            | ServiceError::InvalidKind(_)
            | ServiceError::InvalidDecision(_)
            | ServiceError::InvalidVisitId(_) => StatusCode::BAD_REQUEST,
            ServiceError::ResidentNotFound(_)
            | ServiceError::NotFound(_)
            | ServiceError::AccessNotFound(_)
            | ServiceError::CallNotFound(_)
            | ServiceError::VisitNotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::MissingConfig(_)
            | ServiceError::Call(_)
            | ServiceError::ResidentPhoneMissing(_)
            | ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            ServiceError::InvalidKind(received) => {
                Some(json!({ "received": received, "allowed": ALLOWED_KINDS }))
            }
            ServiceError::MissingConfig(missing) => Some(json!({ "missing": missing })),
            ServiceError::Call(detail) => Some(json!({ "error": detail })),
            ServiceError::ResidentNotFound(housing_unit) => {
                Some(json!({ "housingUnitId": housing_unit }))
            }
            ServiceError::ResidentPhoneMissing(request_id)
            | ServiceError::NotFound(request_id)
            | ServiceError::AccessNotFound(request_id) => {
                Some(json!({ "requestId": request_id }))
            }
            ServiceError::CallNotFound(call_sid) => Some(json!({ "callSid": call_sid })),
            ServiceError::VisitNotFound(visit_id)
            | ServiceError::InvalidVisitId(visit_id) => Some(json!({ "visitId": visit_id })),
            ServiceError::InvalidDecision(received) => {
                Some(json!({ "received": received, "allowed": ["authorized", "rejected"] }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let body: ApiResponse<()> = ApiResponse {
            success: false,
            message: message.clone(),
            data: None,
            error: Some(ErrorBody {
                code: self.code(),
                message,
                details: self.details(),
            }),
        };
        (self.status(), Json(body)).into_response()
    }
}
