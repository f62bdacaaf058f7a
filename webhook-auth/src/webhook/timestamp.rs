//! Replay-window enforcement for signed webhook timestamps.

use chrono::Utc;
use tracing::debug;

/// Default accepted clock skew/delivery delay, in seconds.
pub const DEFAULT_TOLERANCE_SECONDS: u64 = 300;

/// Largest tolerance a provider may be configured with.
pub const MAX_TOLERANCE_SECONDS: u64 = 3600;

const ONE_YEAR_SECONDS: i64 = 365 * 24 * 60 * 60;
const ONE_DAY_SECONDS: i64 = 24 * 60 * 60;

/// Extract the `t=<seconds>` field from a Stripe-style signature header.
///
/// Returns `None` when the header has no timestamp or it is not a plain integer.
pub fn extract_timestamp(signature_header: &str) -> Option<i64> {
    signature_header
        .split(',')
        .filter_map(|part| part.trim().strip_prefix("t="))
        .find_map(|value| {
            if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            value.parse::<i64>().ok()
        })
}

/// Check `timestamp` against the current time with the given tolerance.
pub fn validate_timestamp(timestamp: i64, tolerance_seconds: i64) -> bool {
    validate_timestamp_at(timestamp, tolerance_seconds, Utc::now().timestamp())
}

/// Check `timestamp` against `now` with the given tolerance.
///
/// Timestamps outside `[now - 1 year, now + 1 day]` are rejected regardless of tolerance,
/// as are tolerances outside `[0, 3600]`.
pub fn validate_timestamp_at(timestamp: i64, tolerance_seconds: i64, now: i64) -> bool {
    if timestamp <= 0 {
        debug!("Rejected non-positive timestamp");
        return false;
    }

    if timestamp < now.saturating_sub(ONE_YEAR_SECONDS)
        || timestamp > now.saturating_add(ONE_DAY_SECONDS)
    {
        debug!("Rejected timestamp outside the sanity window");
        return false;
    }

    if !(0..=MAX_TOLERANCE_SECONDS as i64).contains(&tolerance_seconds) {
        debug!("Rejected tolerance of {tolerance_seconds}s");
        return false;
    }

    let skew = (now - timestamp).abs();
    if skew > tolerance_seconds {
        debug!("Timestamp skew of {skew}s exceeds tolerance of {tolerance_seconds}s");
        return false;
    }

    true
}
