//! The engine's notion of "now", with a debug hook to freeze it.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

const NOT_FIXED: i64 = i64::MIN;

static FIXED_TIME: AtomicI64 = AtomicI64::new(NOT_FIXED);

/// Seconds since the Unix epoch, or the frozen time when one is set.
pub fn current_time() -> i32 {
    let fixed = FIXED_TIME.load(Ordering::SeqCst);
    if fixed != NOT_FIXED {
        return fixed as i32;
    }
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        .min(i32::MAX as u64) as i32
}

/// Freezes (`Some`) or releases (`None`) the clock used for decay.
/// Debug-only: affects every dictionary in the process.
pub fn set_current_time_for_test(time: Option<i32>) {
    let value = time.map_or(NOT_FIXED, i64::from);
    FIXED_TIME.store(value, Ordering::SeqCst);
    tracing::info!(fixed = ?time, "current time for test");
}

pub fn is_time_fixed() -> bool {
    FIXED_TIME.load(Ordering::SeqCst) != NOT_FIXED
}
