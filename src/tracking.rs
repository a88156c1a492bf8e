//! In-memory index of live outbound calls.
//!
//! Keyed by the Twilio call SID with a secondary `visitId -> callSid` map so
//! webhook callbacks (which may only carry one of the two) can always find
//! their record. One instance lives in [`crate::AppState`]; tests construct
//! their own. Entries live for the process lifetime.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::NaiveDateTime;
use chrono::Utc;
use serde::Serialize;

/// Snapshot of one outbound call attempt.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub call_sid: String,
    pub visit_id: String,
    pub to: String,
    pub resident_name: String,
    pub visitor_name: String,
    /// Twilio lifecycle status, passed through verbatim
    /// (`initiated`, `ringing`, `in-progress`, `completed`, ...).
    pub call_status: String,
    pub decision: Option<String>,
    pub digit: Option<String>,
    pub answered_by: Option<String>,
    pub duration: Option<String>,
    pub from: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Fields a Twilio status callback may carry. Absent fields leave the
/// stored record untouched.
#[derive(Debug, Default)]
pub struct StatusUpdate<'a> {
    pub visit_id: Option<&'a str>,
    pub duration: Option<&'a str>,
    pub answered_by: Option<&'a str>,
    pub from: Option<&'a str>,
    pub to: Option<&'a str>,
}

#[derive(Default)]
struct Inner {
    by_call_sid: HashMap<String, CallRecord>,
    visit_to_call_sid: HashMap<String, String>,
}

/// Thread-safe call metadata table. All operations take one lock, do map
/// work, and return clones; callers never observe in-place mutation.
#[derive(Default)]
pub struct CallTrackingIndex {
    inner: Mutex<Inner>,
}

impl CallTrackingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly placed call. A later registration for the same
    /// visit overwrites the visit mapping.
    pub fn register(
        &self,
        call_sid: &str,
        visit_id: &str,
        to: &str,
        resident_name: &str,
        visitor_name: &str,
    ) -> CallRecord {
        let now = Utc::now().naive_utc();
        let record = CallRecord {
            call_sid: call_sid.to_string(),
            visit_id: visit_id.to_string(),
            to: to.to_string(),
            resident_name: resident_name.to_string(),
            visitor_name: visitor_name.to_string(),
            call_status: "initiated".to_string(),
            decision: None,
            digit: None,
            answered_by: None,
            duration: None,
            from: None,
            created_at: now,
            updated_at: now,
        };

        let mut inner = self.inner.lock().expect("call tracking lock poisoned");
        if !visit_id.is_empty() {
            inner
                .visit_to_call_sid
                .insert(visit_id.to_string(), call_sid.to_string());
        }
        inner.by_call_sid.insert(call_sid.to_string(), record.clone());
        record
    }

    /// Apply a status callback. Status callbacks can race ahead of
    /// [`register`](Self::register), so an unknown SID synthesizes a record
    /// instead of being dropped.
    pub fn update_status(
        &self,
        call_sid: &str,
        call_status: &str,
        update: StatusUpdate<'_>,
    ) -> CallRecord {
        let now = Utc::now().naive_utc();
        let mut inner = self.inner.lock().expect("call tracking lock poisoned");

        if !inner.by_call_sid.contains_key(call_sid) {
            inner.by_call_sid.insert(
                call_sid.to_string(),
                CallRecord {
                    call_sid: call_sid.to_string(),
                    visit_id: String::new(),
                    to: String::new(),
                    resident_name: String::new(),
                    visitor_name: String::new(),
                    call_status: call_status.to_string(),
                    decision: None,
                    digit: None,
                    answered_by: None,
                    duration: None,
                    from: None,
                    created_at: now,
                    updated_at: now,
                },
            );
        }

        let record = inner
            .by_call_sid
            .get_mut(call_sid)
            .expect("record inserted above");
        record.call_status = call_status.to_string();
        if let Some(duration) = update.duration {
            record.duration = Some(duration.to_string());
        }
        if let Some(answered_by) = update.answered_by {
            record.answered_by = Some(answered_by.to_string());
        }
        if let Some(from) = update.from {
            record.from = Some(from.to_string());
        }
        if let Some(to) = update.to {
            record.to = to.to_string();
        }
        if let Some(visit_id) = update.visit_id.filter(|v| !v.is_empty()) {
            record.visit_id = visit_id.to_string();
        }
        record.updated_at = now;
        let snapshot = record.clone();

        if let Some(visit_id) = update.visit_id.filter(|v| !v.is_empty()) {
            inner
                .visit_to_call_sid
                .insert(visit_id.to_string(), call_sid.to_string());
        }
        snapshot
    }

    /// Record the resident's digit decision, located by call SID first and
    /// by visit id as fallback. Returns `None` when neither resolves.
    pub fn update_decision(
        &self,
        call_sid: Option<&str>,
        visit_id: Option<&str>,
        decision: &str,
        digit: &str,
    ) -> Option<CallRecord> {
        let now = Utc::now().naive_utc();
        let mut inner = self.inner.lock().expect("call tracking lock poisoned");

        let resolved_sid = call_sid
            .filter(|sid| !sid.is_empty())
            .filter(|sid| inner.by_call_sid.contains_key(*sid))
            .map(str::to_string)
            .or_else(|| {
                visit_id
                    .filter(|v| !v.is_empty())
                    .and_then(|v| inner.visit_to_call_sid.get(v).cloned())
            })?;

        let visit_relink = visit_id.filter(|v| !v.is_empty()).map(str::to_string);

        let record = inner.by_call_sid.get_mut(&resolved_sid)?;
        record.decision = Some(decision.to_string());
        record.digit = Some(digit.to_string());
        record.updated_at = now;
        if let Some(visit_id) = &visit_relink {
            record.visit_id = visit_id.clone();
        }
        let snapshot = record.clone();

        if let Some(visit_id) = visit_relink {
            inner.visit_to_call_sid.insert(visit_id, resolved_sid);
        }
        Some(snapshot)
    }

    pub fn by_call_sid(&self, call_sid: &str) -> Option<CallRecord> {
        let inner = self.inner.lock().expect("call tracking lock poisoned");
        inner.by_call_sid.get(call_sid).cloned()
    }

    pub fn by_visit_id(&self, visit_id: &str) -> Option<CallRecord> {
        let inner = self.inner.lock().expect("call tracking lock poisoned");
        let call_sid = inner.visit_to_call_sid.get(visit_id)?;
        inner.by_call_sid.get(call_sid).cloned()
    }
}
