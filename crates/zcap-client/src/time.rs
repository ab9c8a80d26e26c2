//! Time utilities for capability documents and invocation headers.
//!
//! Capability timestamps are RFC 3339 UTC strings with second precision.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Lifetime of a delegated capability when the caller does not pick one.
pub const DEFAULT_DELEGATION_TTL_SECS: i64 = 5 * 60;

/// Lifetime of the `(expires)` parameter on a signed invocation.
pub const INVOCATION_SIGNATURE_TTL_SECS: i64 = 10 * 60;

/// Return the current time.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Default expiry for a capability delegated at `now`.
pub fn default_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::seconds(DEFAULT_DELEGATION_TTL_SECS)
}

/// Format an instant the way capability documents carry it.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format an instant as an HTTP `date` header value (IMF-fixdate).
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
