use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::clock::{Clock, Timestamp};

/// Wall-anchored monotonic clock: the wall time is sampled once at
/// construction and advanced by `Instant` deltas afterwards, so a
/// system clock jump cannot expire fresh table entries.
pub struct MonotonicClock {
    reference: Instant,
    reference_ms: u64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        let reference_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|d| u64::try_from(d.as_millis()).ok())
            .unwrap_or(u64::MAX);
        Self {
            reference: Instant::now(),
            reference_ms,
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&mut self) -> Timestamp {
        let elapsed = u64::try_from(self.reference.elapsed().as_millis()).unwrap_or(u64::MAX);
        Timestamp {
            ms_since_1970: self.reference_ms.saturating_add(elapsed),
        }
    }
}
