//! Best-effort push of a captured in-call decision to the configured
//! decision endpoint.
//!
//! The push happens while Twilio is waiting for our TwiML response, so the
//! client timeout is short and the caller is expected to log the returned
//! error and move on, never to propagate it.

use std::time::Duration;

use axum::async_trait;
use serde_json::json;
use thiserror::Error;

const PUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("no decision webhook configured")]
    NotConfigured,

    #[error("decision push failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("decision endpoint answered {0}")]
    Status(u16),
}

/// A resident decision captured by the voice menu.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionNotification {
    pub decision: String,
    pub resident_name: String,
    pub visitor_name: String,
    pub digit: String,
    pub visit_id: String,
    pub call_sid: Option<String>,
}

/// "Tell the backend what the resident decided" capability.
#[async_trait]
pub trait DecisionNotifier: Send + Sync {
    async fn notify_decision(&self, notification: &DecisionNotification)
        -> Result<(), NotifyError>;
}

pub struct WebhookDecisionNotifier {
    http: reqwest::Client,
    webhook_url: Option<String>,
}

impl WebhookDecisionNotifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        WebhookDecisionNotifier {
            http: reqwest::Client::builder()
                .timeout(PUSH_TIMEOUT)
                .build()
                .expect("reqwest client"),
            webhook_url,
        }
    }
}

#[async_trait]
impl DecisionNotifier for WebhookDecisionNotifier {
    async fn notify_decision(
        &self,
        notification: &DecisionNotification,
    ) -> Result<(), NotifyError> {
        let Some(url) = &self.webhook_url else {
            return Err(NotifyError::NotConfigured);
        };

        let payload = json!({
            "decision": notification.decision,
            "residentName": notification.resident_name,
            "visitorName": notification.visitor_name,
            "digit": notification.digit,
            "visitId": notification.visit_id,
            "callSid": notification.call_sid,
        });

        let response = self.http.post(url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        Ok(())
    }
}
