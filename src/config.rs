//! Telephony configuration, read once from the environment at startup.
//!
//! Keys are kept optional and validated when a call is actually placed, so
//! the server still boots (and serves the non-telephony endpoints) on a box
//! without Twilio credentials.

use std::env;

pub const ENV_ACCOUNT_SID: &str = "TWILIO_ACCOUNT_SID";
pub const ENV_AUTH_TOKEN: &str = "TWILIO_AUTH_TOKEN";
pub const ENV_PHONE_NUMBER: &str = "TWILIO_PHONE_NUMBER";
pub const ENV_BASE_URL: &str = "BASE_URL";
pub const ENV_DECISION_WEBHOOK_URL: &str = "DECISION_WEBHOOK_URL";

#[derive(Debug, Clone, Default)]
pub struct CallConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub phone_number: Option<String>,
    /// Public base URL Twilio uses to reach our webhooks.
    pub base_url: Option<String>,
    /// Endpoint the decision notifier pushes to; unset disables the push.
    pub decision_webhook_url: Option<String>,
}

impl CallConfig {
    pub fn from_env() -> Self {
        CallConfig {
            account_sid: env_nonempty(ENV_ACCOUNT_SID),
            auth_token: env_nonempty(ENV_AUTH_TOKEN),
            phone_number: env_nonempty(ENV_PHONE_NUMBER),
            base_url: env_nonempty(ENV_BASE_URL),
            decision_webhook_url: env_nonempty(ENV_DECISION_WEBHOOK_URL),
        }
    }

    /// Keys a call cannot be placed without. The decision webhook is not
    /// among them; it is best-effort.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.account_sid.is_none() {
            missing.push(ENV_ACCOUNT_SID);
        }
        if self.auth_token.is_none() {
            missing.push(ENV_AUTH_TOKEN);
        }
        if self.phone_number.is_none() {
            missing.push(ENV_PHONE_NUMBER);
        }
        if self.base_url.is_none() {
            missing.push(ENV_BASE_URL);
        }
        missing
    }

    /// Base URL without its trailing slash, so webhook paths can be
    /// concatenated without producing `//`.
    pub fn trimmed_base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(|base| base.trim_end_matches('/'))
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
