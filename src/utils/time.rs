//! Time helpers

use chrono::Utc;

/// Current UTC time as Unix milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
