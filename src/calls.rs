//! Outbound-call orchestration: validate, normalize, dial, track.
//!
//! `CallService` owns the telephony collaborators and the tracking index;
//! handlers call into it and stay thin.

use std::sync::Arc;

use serde::Serialize;

use crate::config::CallConfig;
use crate::notify::{DecisionNotification, DecisionNotifier, NotifyError};
use crate::phone;
use crate::response::ServiceError;
use crate::telephony::CallProvider;
use crate::tracking::CallTrackingIndex;
use crate::twiml::{self, TwimlBuilder};

/// Status-callback webhook path, relative to the public base URL.
pub const STATUS_PATH: &str = "/twilio/status";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedCall {
    pub call_sid: String,
    pub visit_id: String,
}

pub struct CallService {
    config: CallConfig,
    provider: Arc<dyn CallProvider>,
    twiml: Arc<dyn TwimlBuilder>,
    notifier: Arc<dyn DecisionNotifier>,
    tracking: Arc<CallTrackingIndex>,
}

impl CallService {
    pub fn new(
        config: CallConfig,
        provider: Arc<dyn CallProvider>,
        twiml: Arc<dyn TwimlBuilder>,
        notifier: Arc<dyn DecisionNotifier>,
        tracking: Arc<CallTrackingIndex>,
    ) -> Self {
        CallService {
            config,
            provider,
            twiml,
            notifier,
            tracking,
        }
    }

    /// Place the authorization call and register it in the tracking index.
    /// Provider failures come back as `CALL_ERROR`; nothing is retried.
    pub async fn start_call(
        &self,
        to: &str,
        resident_name: &str,
        visitor_name: &str,
        visit_id: &str,
    ) -> Result<StartedCall, ServiceError> {
        if to.trim().is_empty() {
            return Err(ServiceError::MissingDestination);
        }
        let missing = self.config.missing_keys();
        if !missing.is_empty() {
            return Err(ServiceError::MissingConfig(missing));
        }

        let to = phone::normalize(to);
        let base = self.config.trimmed_base_url().expect("base url checked above");
        let from = self
            .config
            .phone_number
            .as_deref()
            .expect("phone number checked above");

        let menu_query = twiml::menu_query(resident_name, visitor_name, visit_id);
        let voice_url = format!("{base}{}?{menu_query}", twiml::VOICE_PATH);
        let status_query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("visitId", visit_id)
            .finish();
        let status_url = format!("{base}{STATUS_PATH}?{status_query}");

        let call_sid = self
            .provider
            .create_call(&to, from, &voice_url, Some(&status_url))
            .await
            .map_err(|err| ServiceError::Call(err.to_string()))?;

        tracing::info!(%call_sid, visit_id, to = %to, "outbound call placed");
        self.tracking
            .register(&call_sid, visit_id, &to, resident_name, visitor_name);

        Ok(StartedCall {
            call_sid,
            visit_id: visit_id.to_string(),
        })
    }

    /// TwiML for the initial voice menu.
    pub fn voice_prompt(&self, resident_name: &str, visitor_name: &str, visit_id: &str) -> String {
        self.twiml.voice_prompt(
            resident_name,
            visitor_name,
            visit_id,
            self.config.trimmed_base_url(),
        )
    }

    /// Handle the gathered digit: record the decision, push it to the
    /// decision endpoint (best-effort), and always hand TwiML back so the
    /// call finishes cleanly no matter what failed on our side.
    pub async fn handle_digit(
        &self,
        raw_digit: &str,
        resident_name: &str,
        visitor_name: &str,
        visit_id: &str,
        call_sid: Option<&str>,
    ) -> String {
        let digit = twiml::normalize_digit(raw_digit);
        let decision = match digit.as_str() {
            "1" => Some("authorized"),
            "2" => Some("rejected"),
            _ => None,
        };

        if let Some(decision) = decision {
            let tracked = self.tracking.update_decision(
                call_sid,
                Some(visit_id).filter(|v| !v.is_empty()),
                decision,
                &digit,
            );
            if tracked.is_none() {
                tracing::warn!(visit_id, ?call_sid, "decision for an untracked call");
            }

            let notification = DecisionNotification {
                decision: decision.to_string(),
                resident_name: resident_name.to_string(),
                visitor_name: visitor_name.to_string(),
                digit: digit.clone(),
                visit_id: visit_id.to_string(),
                call_sid: call_sid.map(str::to_string),
            };
            match self.notifier.notify_decision(&notification).await {
                Ok(()) => tracing::info!(visit_id, decision, "decision pushed"),
                Err(NotifyError::NotConfigured) => {
                    tracing::warn!(visit_id, decision, "no decision webhook configured, decision not pushed");
                }
                Err(err) => {
                    // The voice flow must complete regardless.
                    tracing::warn!(visit_id, decision, error = %err, "decision push failed");
                }
            }
        }

        self.twiml.digit_response(
            &digit,
            resident_name,
            visitor_name,
            visit_id,
            self.config.trimmed_base_url(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{failing_notifier, test_config, MockCallProvider, RecordingNotifier, StubTwiml};

    fn service(
        config: CallConfig,
        provider: Arc<MockCallProvider>,
        notifier: Arc<RecordingNotifier>,
        tracking: Arc<CallTrackingIndex>,
    ) -> CallService {
        CallService::new(config, provider, Arc::new(StubTwiml), notifier, tracking)
    }

    #[tokio::test]
    async fn rejects_empty_destination_before_anything_else() {
        let provider = Arc::new(MockCallProvider::answering("CA1"));
        let svc = service(
            CallConfig::default(),
            provider.clone(),
            Arc::new(RecordingNotifier::default()),
            Arc::new(CallTrackingIndex::new()),
        );

        let err = svc.start_call("  ", "Maria", "Juan", "41").await.unwrap_err();
        assert_eq!(err.code(), "MISSING_DESTINATION");
        assert!(provider.placed().is_empty());
    }

    #[tokio::test]
    async fn reports_every_missing_config_key() {
        let svc = service(
            CallConfig::default(),
            Arc::new(MockCallProvider::answering("CA1")),
            Arc::new(RecordingNotifier::default()),
            Arc::new(CallTrackingIndex::new()),
        );

        match svc.start_call("0991234567", "Maria", "Juan", "41").await {
            Err(ServiceError::MissingConfig(missing)) => {
                assert_eq!(missing.len(), 4);
                assert!(missing.contains(&"BASE_URL"));
            }
            other => panic!("expected MissingConfig, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn places_normalized_call_and_registers_it() {
        let provider = Arc::new(MockCallProvider::answering("CA77"));
        let tracking = Arc::new(CallTrackingIndex::new());
        let svc = service(
            test_config(),
            provider.clone(),
            Arc::new(RecordingNotifier::default()),
            tracking.clone(),
        );

        let started = svc
            .start_call("0991234567", "Maria Paz", "Juan", "41")
            .await
            .unwrap();
        assert_eq!(started.call_sid, "CA77");
        assert_eq!(started.visit_id, "41");

        let placed = provider.placed();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].to, "+593991234567");
        assert_eq!(placed[0].from, "+15005550006");
        // Trailing slash of BASE_URL must not produce `//`.
        assert!(placed[0]
            .voice_url
            .starts_with("https://garita.example.com/twilio/voice?"));
        assert!(placed[0].voice_url.contains("visitId=41"));
        assert_eq!(
            placed[0].status_callback_url.as_deref(),
            Some("https://garita.example.com/twilio/status?visitId=41")
        );

        let record = tracking.by_visit_id("41").unwrap();
        assert_eq!(record.call_sid, "CA77");
        assert_eq!(record.call_status, "initiated");
    }

    #[tokio::test]
    async fn provider_failure_becomes_call_error() {
        let svc = service(
            test_config(),
            Arc::new(MockCallProvider::failing()),
            Arc::new(RecordingNotifier::default()),
            Arc::new(CallTrackingIndex::new()),
        );

        let err = svc
            .start_call("0991234567", "Maria", "Juan", "41")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CALL_ERROR");
    }

    #[tokio::test]
    async fn digit_one_records_and_notifies() {
        let notifier = Arc::new(RecordingNotifier::default());
        let tracking = Arc::new(CallTrackingIndex::new());
        tracking.register("CA1", "41", "+593991234567", "Maria Paz", "Juan");
        let svc = service(
            test_config(),
            Arc::new(MockCallProvider::answering("CA1")),
            notifier.clone(),
            tracking.clone(),
        );

        svc.handle_digit(" 1 ", "Maria Paz", "Juan", "41", Some("CA1"))
            .await;

        let record = tracking.by_call_sid("CA1").unwrap();
        assert_eq!(record.decision.as_deref(), Some("authorized"));
        assert_eq!(record.digit.as_deref(), Some("1"));

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].decision, "authorized");
        assert_eq!(sent[0].visit_id, "41");
        assert_eq!(sent[0].call_sid.as_deref(), Some("CA1"));
    }

    #[tokio::test]
    async fn repeat_digit_neither_records_nor_notifies() {
        let notifier = Arc::new(RecordingNotifier::default());
        let tracking = Arc::new(CallTrackingIndex::new());
        tracking.register("CA1", "41", "+593991234567", "Maria Paz", "Juan");
        let svc = service(
            test_config(),
            Arc::new(MockCallProvider::answering("CA1")),
            notifier.clone(),
            tracking.clone(),
        );

        svc.handle_digit("3", "Maria Paz", "Juan", "41", Some("CA1"))
            .await;

        assert!(tracking.by_call_sid("CA1").unwrap().decision.is_none());
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn notifier_failure_still_returns_twiml() {
        let tracking = Arc::new(CallTrackingIndex::new());
        tracking.register("CA1", "41", "+593991234567", "Maria Paz", "Juan");
        let svc = CallService::new(
            test_config(),
            Arc::new(MockCallProvider::answering("CA1")),
            Arc::new(StubTwiml),
            failing_notifier(),
            tracking.clone(),
        );

        let twiml = svc
            .handle_digit("2", "Maria Paz", "Juan", "41", Some("CA1"))
            .await;
        assert!(!twiml.is_empty());
        // The decision still landed in the index.
        assert_eq!(
            tracking.by_call_sid("CA1").unwrap().decision.as_deref(),
            Some("rejected")
        );
    }
}
