//! Monotonic time helpers shared by the queue, pairing, and security managers.

use std::time::{Duration, Instant};

/// Returns the duration elapsed since `since`, saturating at zero.
///
/// Saturating avoids a panic if a clock read races a concurrent update and
/// observes `since` as slightly in the future.
pub fn elapsed_since(since: Instant) -> Duration {
    Instant::now().saturating_duration_since(since)
}
