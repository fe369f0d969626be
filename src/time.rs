//! Millisecond wall-clock timestamps used for order/trade bookkeeping.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time, milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_millis() as u64
}
