//! Timing helpers for spread passes.
//!
//! Provides an RAII scope that traces its duration when dropped, and a pass
//! timer that keeps the last and average pass duration.
use std::time::{Duration, Instant};
use tracing::trace;

/// A profiling scope that measures elapsed time using RAII.
///
/// The duration is emitted at `trace` level when dropped.
pub struct ProfilerScope {
    start: Instant,
    name: &'static str,
}

impl ProfilerScope {
    /// Creates a new profiling scope.
    pub fn new(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
        }
    }

    /// Gets elapsed time in microseconds.
    pub fn elapsed_us(&self) -> u64 {
        duration_us(self.start.elapsed())
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for ProfilerScope {
    fn drop(&mut self) {
        trace!(scope = self.name, elapsed_us = self.elapsed_us(), "Profiler scope finished");
    }
}

/// Last and running-average duration of calculation passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassTimer {
    last_us: u64,
    total_us: u64,
    passes: u64,
}

impl PassTimer {
    /// Creates a new pass timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one pass.
    pub fn record(&mut self, elapsed: Duration) {
        self.last_us = duration_us(elapsed);
        self.total_us = self.total_us.saturating_add(self.last_us);
        self.passes += 1;
    }

    /// Duration of the most recent pass in microseconds, 0 before the first.
    pub fn last_us(&self) -> u64 {
        self.last_us
    }

    pub fn average_us(&self) -> u64 {
        if self.passes == 0 {
            0
        } else {
            self.total_us / self.passes
        }
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }
}

fn duration_us(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_profiler_scope_measures_time() {
        let scope = ProfilerScope::new("test");
        thread::sleep(Duration::from_millis(10));
        let elapsed = scope.elapsed_us();
        assert!(elapsed >= 10_000, "Expected at least 10ms, got {elapsed}us");
    }

    #[test]
    fn test_pass_timer() {
        let mut timer = PassTimer::new();
        assert_eq!(timer.last_us(), 0);
        assert_eq!(timer.average_us(), 0);

        timer.record(Duration::from_micros(300));
        assert_eq!(timer.last_us(), 300);

        timer.record(Duration::from_micros(100));
        assert_eq!(timer.last_us(), 100);
        assert_eq!(timer.average_us(), 200);
        assert_eq!(timer.passes(), 2);
    }
}
