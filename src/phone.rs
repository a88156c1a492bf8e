//! Best-effort normalization of Ecuadorian mobile numbers into E.164.
//!
//! Dialability is Twilio's problem; anything we cannot make sense of is
//! returned untouched.

/// Ecuador country calling code, without the `+`.
const COUNTRY_CODE: &str = "593";

/// Convert a locally formatted number (`0991234567`) to international
/// format (`+593991234567`). Numbers already carrying the country code or a
/// leading `+` pass through; unrecognizable input is returned as-is.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return raw.to_string();
    }

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return raw.to_string();
    }

    if let Some(rest) = digits.strip_prefix('0') {
        return format!("+{COUNTRY_CODE}{rest}");
    }
    if digits.starts_with(COUNTRY_CODE) {
        return format!("+{digits}");
    }
    if trimmed.starts_with('+') {
        return raw.to_string();
    }
    raw.to_string()
}
