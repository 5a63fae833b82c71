// src/scrub.rs
//! Stateless PII filter applied to generated text before it is stored.

use once_cell::sync::Lazy;
use regex::Regex;

pub const EMAIL_REDACTED: &str = "[EMAIL_REDACTED]";
pub const PHONE_REDACTED: &str = "[PHONE_REDACTED]";

static RE_EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
});

static RE_PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\b|\+1[-. ]?)\(?[0-9]{3}\)?[-. ]?[0-9]{3}[-. ]?[0-9]{4}\b").unwrap()
});

/// Replace email- and US-phone-shaped substrings with fixed redaction
/// markers. Idempotent: already-scrubbed text passes through unchanged.
pub fn scrub_pii(text: &str) -> String {
    let pass = RE_EMAIL.replace_all(text, EMAIL_REDACTED);
    RE_PHONE.replace_all(&pass, PHONE_REDACTED).into_owned()
}
