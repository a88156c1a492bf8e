//! Codec for the free-text note column on `access_request`.
//!
//! The legacy schema has no columns for telephony metadata, so decisions are
//! carried as ` | `-joined `key=value` pairs inside the note field, e.g.
//! `decision_twilio=authorized | digit=1 | callSid=CA123`. Parsing is
//! forward-compatible: segments without `=` and unknown keys are ignored.

use std::collections::HashMap;

pub const KEY_DECISION: &str = "decision_twilio";
pub const KEY_DIGIT: &str = "digit";
pub const KEY_CALL_SID: &str = "callSid";

const SEPARATOR: &str = " | ";

/// Render `key=value` pairs into the side-channel format.
pub fn format_note(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Parse a note back into its pairs. Never fails; malformed segments are
/// skipped and later duplicates of a key win.
pub fn parse_note(note: &str) -> HashMap<String, String> {
    let mut pairs = HashMap::new();
    for segment in note.split('|') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let Some((key, value)) = segment.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if !key.is_empty() {
            pairs.insert(key.to_string(), value.trim().to_string());
        }
    }
    pairs
}
