//! Wall-clock access shared by the store and the anonymous buffer.

use chrono::Utc;

/// Current time in Unix epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}
