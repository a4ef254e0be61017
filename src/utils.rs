//! Small shared helpers.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as nanoseconds since the Unix epoch.
///
/// Used to stamp orders and trades. Stamps are observability data only and
/// never participate in ordering decisions.
#[must_use]
pub fn current_time_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}
