use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU32, Ordering};

/// Process-wide message id counter, starting at 1 and wrapping on overflow.
static GLOBAL_ID_COUNTER: Lazy<AtomicU32> = Lazy::new(|| AtomicU32::new(1));

/// Returns the next message id.
///
/// Ids only need to be unique among calls in flight on one connection, so
/// wrapping is harmless.
#[inline]
pub fn increment_u32_id() -> u32 {
    GLOBAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}
