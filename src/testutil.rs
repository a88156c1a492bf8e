//! In-memory/mock implementations of the collaborator ports, shared by the
//! unit tests across modules.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::async_trait;
use chrono::Utc;

use crate::access::{AccessStore, StoreError};
use crate::config::CallConfig;
use crate::models::{AccessRequest, NewAccessRequest, Resident};
use crate::notify::{DecisionNotification, DecisionNotifier, NotifyError};
use crate::telephony::{CallProvider, ProviderError};
use crate::twiml::TwimlBuilder;

pub fn test_config() -> CallConfig {
    CallConfig {
        account_sid: Some("ACtest".into()),
        auth_token: Some("secret".into()),
        phone_number: Some("+15005550006".into()),
        // Trailing slash on purpose: start_call must not emit `//`.
        base_url: Some("https://garita.example.com/".into()),
        decision_webhook_url: Some("https://backend.example.com/decision".into()),
    }
}

pub fn sample_resident() -> Resident {
    Resident {
        housing_unit_id: 7,
        person_id: 3,
        first_names: "Maria".into(),
        last_names: "Paz".into(),
        mobile_phone: Some("0991234567".into()),
    }
}

// ─── CallProvider ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PlacedCall {
    pub to: String,
    pub from: String,
    pub voice_url: String,
    pub status_callback_url: Option<String>,
}

pub struct MockCallProvider {
    sid: String,
    fail: bool,
    calls: Mutex<Vec<PlacedCall>>,
}

impl MockCallProvider {
    pub fn answering(sid: &str) -> Self {
        MockCallProvider {
            sid: sid.to_string(),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        MockCallProvider {
            sid: String::new(),
            fail: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn placed(&self) -> Vec<PlacedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CallProvider for MockCallProvider {
    async fn create_call(
        &self,
        to: &str,
        from: &str,
        voice_url: &str,
        status_callback_url: Option<&str>,
    ) -> Result<String, ProviderError> {
        if self.fail {
            return Err(ProviderError::Api {
                status: 400,
                body: "unable to create record".into(),
            });
        }
        self.calls.lock().unwrap().push(PlacedCall {
            to: to.to_string(),
            from: from.to_string(),
            voice_url: voice_url.to_string(),
            status_callback_url: status_callback_url.map(str::to_string),
        });
        Ok(self.sid.clone())
    }
}

// ─── DecisionNotifier ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNotifier {
    fail: bool,
    sent: Mutex<Vec<DecisionNotification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<DecisionNotification> {
        self.sent.lock().unwrap().clone()
    }
}

pub fn failing_notifier() -> Arc<RecordingNotifier> {
    Arc::new(RecordingNotifier {
        fail: true,
        sent: Mutex::new(Vec::new()),
    })
}

#[async_trait]
impl DecisionNotifier for RecordingNotifier {
    async fn notify_decision(
        &self,
        notification: &DecisionNotification,
    ) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Status(500));
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

// ─── TwimlBuilder ────────────────────────────────────────────────────────────

pub struct StubTwiml;

impl TwimlBuilder for StubTwiml {
    fn voice_prompt(
        &self,
        _resident_name: &str,
        _visitor_name: &str,
        visit_id: &str,
        _base_url: Option<&str>,
    ) -> String {
        format!("<Response>prompt:{visit_id}</Response>")
    }

    fn digit_response(
        &self,
        digit: &str,
        _resident_name: &str,
        _visitor_name: &str,
        visit_id: &str,
        _base_url: Option<&str>,
    ) -> String {
        format!("<Response>digit:{digit}:{visit_id}</Response>")
    }
}

// ─── AccessStore ─────────────────────────────────────────────────────────────

/// HashMap-backed store. `store_calls` counts every method hit so tests can
/// assert validation short-circuits before touching the store.
pub struct MemAccessStore {
    pub resident: Option<Resident>,
    pub supports_pending: bool,
    pub rows: HashMap<i32, AccessRequest>,
    pub store_calls: usize,
    next_id: i32,
}

impl MemAccessStore {
    pub fn new(resident: Option<Resident>, supports_pending: bool) -> Self {
        MemAccessStore {
            resident,
            supports_pending,
            rows: HashMap::new(),
            store_calls: 0,
            next_id: 1,
        }
    }

    /// Seed a raw row, bypassing the service (legacy data shapes).
    pub fn seed_row(&mut self, row: AccessRequest) {
        self.next_id = self.next_id.max(row.id + 1);
        self.rows.insert(row.id, row);
    }
}

impl AccessStore for MemAccessStore {
    fn supports_pending_outcome(&mut self) -> Result<bool, StoreError> {
        self.store_calls += 1;
        Ok(self.supports_pending)
    }

    fn resident_for_housing_unit(
        &mut self,
        housing_unit_id: i32,
    ) -> Result<Option<Resident>, StoreError> {
        self.store_calls += 1;
        Ok(self
            .resident
            .clone()
            .filter(|resident| resident.housing_unit_id == housing_unit_id))
    }

    fn create_access_request(
        &mut self,
        new_request: NewAccessRequest,
    ) -> Result<AccessRequest, StoreError> {
        self.store_calls += 1;
        let id = self.next_id;
        self.next_id += 1;
        let row = AccessRequest {
            id,
            kind: new_request.kind,
            housing_unit_fk: new_request.housing_unit_fk,
            outcome: new_request.outcome,
            reason: new_request.reason,
            guard_person_fk: new_request.guard_person_fk,
            authorizing_resident_fk: new_request.authorizing_resident_fk,
            note: new_request.note,
            deleted: new_request.deleted,
            created_at: Utc::now().naive_utc(),
            created_by: new_request.created_by,
            updated_at: None,
            updated_by: None,
        };
        self.rows.insert(id, row.clone());
        Ok(row)
    }

    fn access_request_by_id(&mut self, id: i32) -> Result<Option<AccessRequest>, StoreError> {
        self.store_calls += 1;
        Ok(self.rows.get(&id).cloned())
    }

    fn update_outcome(
        &mut self,
        id: i32,
        outcome: &str,
        note: &str,
        actor: &str,
    ) -> Result<Option<AccessRequest>, StoreError> {
        self.store_calls += 1;
        let Some(row) = self.rows.get_mut(&id).filter(|row| !row.deleted) else {
            return Ok(None);
        };
        row.outcome = outcome.to_string();
        row.note = Some(note.to_string());
        row.updated_by = Some(actor.to_string());
        row.updated_at = Some(Utc::now().naive_utc());
        Ok(Some(row.clone()))
    }
}
