//! Lifecycle of a persisted access request: create pending, apply a
//! decision, expose a polling view.
//!
//! The service talks to the store through [`AccessStore`], so tests run
//! against an in-memory implementation and production against Diesel.

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;

use crate::calls::CallService;
use crate::models::{AccessRequest, NewAccessRequest, Resident};
use crate::note;
use crate::phone;
use crate::response::ServiceError;

/// Origin tags the legacy schema accepts for an access row.
pub const ALLOWED_KINDS: [&str; 6] = [
    "qr_resident",
    "qr_visit",
    "visit_without_qr",
    "pedestrian_visit",
    "resident_automatic",
    "manual_guard",
];

/// Requests created through this flow are always guard-less walk-in visits.
const DEFAULT_KIND: &str = "visit_without_qr";

const SYSTEM_ACTOR: &str = "system";
const TWILIO_ACTOR: &str = "twilio";

pub const OUTCOME_PENDING: &str = "pending";
pub const OUTCOME_AUTHORIZED: &str = "authorized";
pub const OUTCOME_REJECTED: &str = "rejected";
/// What older schemas store instead of `pending`; clients still see the
/// logical state `pending`.
pub const OUTCOME_NOT_AUTHORIZED: &str = "not_authorized";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

/// Narrow read/write contract over the legacy relational store.
pub trait AccessStore {
    /// Whether the outcome check constraint admits a real `pending` value.
    fn supports_pending_outcome(&mut self) -> Result<bool, StoreError>;

    /// Current resident for a housing unit, active tenancy first.
    fn resident_for_housing_unit(
        &mut self,
        housing_unit_id: i32,
    ) -> Result<Option<Resident>, StoreError>;

    fn create_access_request(
        &mut self,
        new_request: NewAccessRequest,
    ) -> Result<AccessRequest, StoreError>;

    fn access_request_by_id(&mut self, id: i32) -> Result<Option<AccessRequest>, StoreError>;

    /// Single-row atomic outcome+note+audit update. `None` when the row is
    /// missing or soft-deleted.
    fn update_outcome(
        &mut self,
        id: i32,
        outcome: &str,
        note: &str,
        actor: &str,
    ) -> Result<Option<AccessRequest>, StoreError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAccess {
    pub request_id: i32,
    pub visit_id: String,
    pub state: &'static str,
    pub persisted_outcome: String,
    pub reason: Option<String>,
    pub kind: String,
    pub housing_unit_id: i32,
    pub schema_supports_pending: bool,
    /// Normalized phone of the resolved resident, handed back so the caller
    /// can start the authorization call right away.
    pub resident_phone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallStarted {
    pub request_id: i32,
    pub call_sid: String,
    pub visit_id: String,
    pub state: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionApplied {
    pub request_id: i32,
    pub outcome: String,
    pub note: Option<String>,
    pub updated_at: Option<NaiveDateTime>,
}

/// Client-facing merged view of a request while its call is in flight.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingStatus {
    pub request_id: i32,
    pub state: String,
    pub finished: bool,
    pub can_proceed: bool,
    pub persisted_outcome: String,
    pub reason: Option<String>,
    pub digit: Option<String>,
    pub call_sid: Option<String>,
    pub updated_at: Option<NaiveDateTime>,
    pub updated_by: Option<String>,
}

pub struct AccessService<S: AccessStore> {
    pub(crate) store: S,
}

impl<S: AccessStore> AccessService<S> {
    pub fn new(store: S) -> Self {
        AccessService { store }
    }

    /// Create a request in the logical `pending` state. Validation happens
    /// before any store access.
    pub fn create(&mut self, housing_unit_id: i32, reason: &str) -> Result<CreatedAccess, ServiceError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ServiceError::MissingReason);
        }
        if !ALLOWED_KINDS.contains(&DEFAULT_KIND) {
            return Err(ServiceError::InvalidKind(DEFAULT_KIND.to_string()));
        }

        let resident = self
            .store
            .resident_for_housing_unit(housing_unit_id)?
            .ok_or(ServiceError::ResidentNotFound(housing_unit_id))?;

        let supports_pending = self.store.supports_pending_outcome()?;
        let initial_outcome = if supports_pending {
            OUTCOME_PENDING
        } else {
            OUTCOME_NOT_AUTHORIZED
        };

        let row = self.store.create_access_request(NewAccessRequest {
            kind: DEFAULT_KIND.to_string(),
            housing_unit_fk: housing_unit_id,
            outcome: initial_outcome.to_string(),
            reason: Some(reason.to_string()),
            guard_person_fk: None,
            authorizing_resident_fk: Some(resident.person_id),
            note: None,
            deleted: false,
            created_by: SYSTEM_ACTOR.to_string(),
        })?;

        let resident_phone = resident
            .mobile_phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(phone::normalize);

        Ok(CreatedAccess {
            request_id: row.id,
            visit_id: row.id.to_string(),
            state: OUTCOME_PENDING,
            persisted_outcome: row.outcome,
            reason: row.reason,
            kind: row.kind,
            housing_unit_id: row.housing_unit_fk,
            schema_supports_pending: supports_pending,
            resident_phone,
        })
    }

    /// Phone the resident of the request's housing unit, using the request
    /// id as the visit correlation key.
    pub async fn start_authorization_call(
        &mut self,
        request_id: i32,
        visitor_name: Option<&str>,
        calls: &CallService,
    ) -> Result<CallStarted, ServiceError> {
        let row = self
            .store
            .access_request_by_id(request_id)?
            .ok_or(ServiceError::NotFound(request_id))?;

        let resident = self
            .store
            .resident_for_housing_unit(row.housing_unit_fk)?
            .ok_or(ServiceError::ResidentNotFound(row.housing_unit_fk))?;

        let raw_phone = resident
            .mobile_phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(ServiceError::ResidentPhoneMissing(request_id))?;

        let started = calls
            .start_call(
                &phone::normalize(raw_phone),
                &resident.full_name(),
                visitor_name.map(str::trim).unwrap_or_default(),
                &request_id.to_string(),
            )
            .await?;

        Ok(CallStarted {
            request_id,
            call_sid: started.call_sid,
            visit_id: started.visit_id,
            state: OUTCOME_PENDING,
        })
    }

    /// Persist a decision arriving from either channel. A later decision
    /// overwrites an earlier one; there is no transition guard.
    pub fn apply_decision(
        &mut self,
        decision: &str,
        visit_id: &str,
        digit: Option<&str>,
        call_sid: Option<&str>,
    ) -> Result<DecisionApplied, ServiceError> {
        let normalized = decision.trim().to_lowercase();
        let outcome = match normalized.as_str() {
            OUTCOME_AUTHORIZED => OUTCOME_AUTHORIZED,
            OUTCOME_REJECTED => OUTCOME_REJECTED,
            _ => return Err(ServiceError::InvalidDecision(decision.to_string())),
        };

        let request_id: i32 = visit_id
            .trim()
            .parse()
            .map_err(|_| ServiceError::InvalidVisitId(visit_id.to_string()))?;

        let mut pairs = vec![(note::KEY_DECISION, outcome)];
        if let Some(digit) = digit.filter(|d| !d.is_empty()) {
            pairs.push((note::KEY_DIGIT, digit));
        }
        if let Some(sid) = call_sid.filter(|s| !s.is_empty()) {
            pairs.push((note::KEY_CALL_SID, sid));
        }
        let note_text = note::format_note(&pairs);

        let updated = self
            .store
            .update_outcome(request_id, outcome, &note_text, TWILIO_ACTOR)?
            .ok_or(ServiceError::AccessNotFound(request_id))?;

        Ok(DecisionApplied {
            request_id: updated.id,
            outcome: updated.outcome,
            note: updated.note,
            updated_at: updated.updated_at,
        })
    }

    /// Merged status for polling clients. The side-channel decision beats
    /// the physical column, which may still hold the `not_authorized`
    /// placeholder on schemas without a pending value.
    pub fn polling_status(&mut self, request_id: i32) -> Result<PollingStatus, ServiceError> {
        let row = self
            .store
            .access_request_by_id(request_id)?
            .ok_or(ServiceError::NotFound(request_id))?;

        let pairs = note::parse_note(row.note.as_deref().unwrap_or_default());
        let side_channel = pairs
            .get(note::KEY_DECISION)
            .map(|value| value.trim().to_lowercase())
            .unwrap_or_default();
        let physical = row.outcome.trim().to_lowercase();

        let state = if is_decided(&side_channel) {
            side_channel
        } else if is_decided(&physical) {
            physical
        } else {
            OUTCOME_PENDING.to_string()
        };

        let finished = is_decided(&state);
        Ok(PollingStatus {
            request_id: row.id,
            can_proceed: state == OUTCOME_AUTHORIZED,
            state,
            finished,
            persisted_outcome: row.outcome,
            reason: row.reason,
            digit: pairs.get(note::KEY_DIGIT).cloned(),
            call_sid: pairs.get(note::KEY_CALL_SID).cloned(),
            updated_at: row.updated_at,
            updated_by: row.updated_by,
        })
    }

    pub fn get_by_id(&mut self, request_id: i32) -> Result<AccessRequest, ServiceError> {
        self.store
            .access_request_by_id(request_id)?
            .ok_or(ServiceError::NotFound(request_id))
    }
}

fn is_decided(state: &str) -> bool {
    state == OUTCOME_AUTHORIZED || state == OUTCOME_REJECTED
}
