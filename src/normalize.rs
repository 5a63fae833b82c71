// src/normalize.rs
//! Date and version normalization for heterogeneous feed metadata.
//!
//! Feeds hand us ISO-8601, RFC 2822, bare `YYYY-MM-DD`, or garbage. Every
//! raw date stays a string on the record; callers derive the canonical
//! timestamp on demand through [`canonical_date`], which never fails.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Age assigned to unparseable dates. Anything we cannot read is treated
/// as a year old, so it can never pass a recency cutoff.
const SENTINEL_AGE_DAYS: i64 = 365;

/// Timestamp used for records whose date string could not be parsed.
pub fn sentinel_date() -> DateTime<Utc> {
    Utc::now() - Duration::days(SENTINEL_AGE_DAYS)
}

/// Parse an arbitrary date string into a timezone-aware UTC timestamp.
///
/// Tries ISO-8601 (a literal `T` is the trigger), then RFC 2822, then the
/// first ten characters as `YYYY-MM-DD`. Total failure returns the
/// [`sentinel_date`] instead of an error.
pub fn canonical_date(raw: &str) -> DateTime<Utc> {
    let s = raw.trim();
    if s.contains('T') {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return dt.with_timezone(&Utc);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return dt.with_timezone(&Utc);
    }
    let head: String = s.chars().take(10).collect();
    if let Ok(d) = NaiveDate::parse_from_str(&head, "%Y-%m-%d") {
        if let Some(dt) = d.and_hms_opt(0, 0, 0) {
            return dt.and_utc();
        }
    }
    sentinel_date()
}

static RE_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.\d+(?:\.\d+)?(?:[a-zA-Z]+\d+)?)").unwrap());

/// Best-effort extraction of a dotted version from tokens like `v1.2.3`,
/// `package==1.2.3`, or `Release 1.24.0`. Not a semver parser: when no
/// dotted-numeric pattern exists, the trimmed input (minus a leading `v`)
/// passes through unchanged.
pub fn clean_version(raw: &str) -> String {
    if let Some(m) = RE_VERSION.find(raw) {
        return m.as_str().to_string();
    }
    raw.trim().trim_start_matches('v').to_string()
}
