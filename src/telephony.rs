//! Outbound call capability.
//!
//! [`CallProvider`] is the seam between the orchestrator and the telephony
//! vendor; [`TwilioCallProvider`] talks to the Twilio REST API.

use std::time::Duration;

use axum::async_trait;
use serde::Deserialize;
use thiserror::Error;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Lifecycle events we subscribe the status callback to.
const STATUS_EVENTS: [&str; 4] = ["initiated", "ringing", "answered", "completed"];

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("twilio request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("twilio api returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// "Place a call" capability of the telephony vendor.
#[async_trait]
pub trait CallProvider: Send + Sync {
    /// Start an outbound call that fetches its voice menu from `voice_url`.
    /// Returns the provider-assigned call SID.
    async fn create_call(
        &self,
        to: &str,
        from: &str,
        voice_url: &str,
        status_callback_url: Option<&str>,
    ) -> Result<String, ProviderError>;
}

pub struct TwilioCallProvider {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
}

#[derive(Deserialize)]
struct CallCreated {
    sid: String,
}

impl TwilioCallProvider {
    pub fn new(account_sid: String, auth_token: String) -> Self {
        TwilioCallProvider {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("reqwest client"),
            account_sid,
            auth_token,
        }
    }
}

#[async_trait]
impl CallProvider for TwilioCallProvider {
    async fn create_call(
        &self,
        to: &str,
        from: &str,
        voice_url: &str,
        status_callback_url: Option<&str>,
    ) -> Result<String, ProviderError> {
        let url = format!(
            "{TWILIO_API_BASE}/Accounts/{}/Calls.json",
            self.account_sid
        );

        let mut params: Vec<(&str, &str)> = vec![
            ("To", to),
            ("From", from),
            ("Url", voice_url),
            ("Method", "POST"),
        ];
        if let Some(callback) = status_callback_url {
            params.push(("StatusCallback", callback));
            params.push(("StatusCallbackMethod", "POST"));
            for event in STATUS_EVENTS {
                params.push(("StatusCallbackEvent", event));
            }
        }

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let created: CallCreated = response.json().await?;
        Ok(created.sid)
    }
}
