//! Throttling support
//!
//! The API answers HTTP 429 with a `Retry-After` header holding either a
//! number of seconds or an HTTP date. [`parse_retry_after`] turns either
//! form into a [`Duration`].

use std::time::Duration;

use tracing::warn;

/// Wait used when a 429 carries no usable `Retry-After`
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Default number of retries after a 429
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Longest wait accepted from an HTTP-date `Retry-After`
const MAX_RETRY_AFTER_SECS: u64 = 3600;

/// Parses a `Retry-After` header value
///
/// Accepts integer seconds or an RFC 2822 date. Dates in the past or more
/// than an hour ahead, and unparsable values, yield `default`.
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    let value = value.trim();

    if let Ok(seconds) = value.parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value) {
        let wait = date.with_timezone(&chrono::Utc) - chrono::Utc::now();
        if let Ok(secs) = u64::try_from(wait.num_seconds()) {
            if secs <= MAX_RETRY_AFTER_SECS {
                return Duration::from_secs(secs);
            }
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}

/// Extracts the wait from a throttled response's headers
pub fn retry_after_from(headers: &reqwest::header::HeaderMap) -> Duration {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
        .unwrap_or(DEFAULT_RETRY_AFTER)
}
