//! Injected clock, kept out of the resolution engine's direct control so
//! resolution timing (RPC deadlines, retry back-off) is deterministic in tests.

use std::time::{Duration, Instant};

use async_trait::async_trait;

/// A source of time the core consumes rather than calling `Instant::now()`
/// directly, matching the "consumes only a logger, a clock, and a gRPC
/// client interface" boundary from the specification.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Returns a monotonic instant usable for measuring elapsed durations.
    fn now(&self) -> Instant;

    /// Suspends the current task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// The real wall clock, backed by `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn system_clock_advances() {
        let clock = SystemClock;
        let start = clock.now();
        clock.sleep(Duration::from_millis(5)).await;
        assert!(clock.now() >= start);
    }
}
