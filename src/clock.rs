use chrono::Utc;

/// Source of wall-clock epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        // Pre-1970 readings only come from a badly broken RTC
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::atomic::{AtomicU64, Ordering};

    use tokio::time::Instant;

    use super::Clock;

    /// Clock moved by hand.
    pub struct ManualClock(AtomicU64);

    impl ManualClock {
        pub fn new(now_ms: u64) -> Self {
            Self(AtomicU64::new(now_ms))
        }

        pub fn set(&self, now_ms: u64) {
            self.0.store(now_ms, Ordering::SeqCst);
        }

        pub fn advance(&self, ms: u64) {
            self.0.fetch_add(ms, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    /// Wall clock that follows tokio's (possibly paused) time.
    pub struct TokioClock {
        origin: Instant,
        base_ms: u64,
    }

    impl TokioClock {
        pub fn new(base_ms: u64) -> Self {
            Self {
                origin: Instant::now(),
                base_ms,
            }
        }
    }

    impl Clock for TokioClock {
        fn now_ms(&self) -> u64 {
            self.base_ms + self.origin.elapsed().as_millis() as u64
        }
    }
}
