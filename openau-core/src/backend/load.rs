//! Callback CPU load tracking
//!
//! **REAL-TIME SAFE**: `record` only touches atomics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Smoothing factor applied to each new sample
const SMOOTHING: f64 = 0.1;

/// Exponentially smoothed ratio of callback busy time to buffer duration
#[derive(Debug, Default)]
pub struct CpuLoadMeter {
    /// f64 bits of the smoothed load
    load_bits: AtomicU64,
}

impl CpuLoadMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one callback that spent `busy` producing `budget` worth of audio.
    pub fn record(&self, busy: Duration, budget: Duration) {
        if budget.is_zero() {
            return;
        }
        let sample = busy.as_secs_f64() / budget.as_secs_f64();
        let previous = self.load();
        let next = if previous == 0.0 {
            sample
        } else {
            previous + SMOOTHING * (sample - previous)
        };
        self.load_bits.store(next.to_bits(), Ordering::Relaxed);
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.load_bits.load(Ordering::Relaxed))
    }
}

/// Wall-clock duration of `frames` frames at `sample_rate`
pub fn buffer_duration(frames: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(frames as u64 * 1_000_000_000 / u64::from(sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_sets_load() {
        let meter = CpuLoadMeter::new();
        assert_eq!(meter.load(), 0.0);
        meter.record(Duration::from_millis(1), Duration::from_millis(10));
        assert!((meter.load() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_load_is_smoothed() {
        let meter = CpuLoadMeter::new();
        meter.record(Duration::from_millis(1), Duration::from_millis(10));
        meter.record(Duration::from_millis(10), Duration::from_millis(10));
        // 0.1 + 0.1 * (1.0 - 0.1)
        assert!((meter.load() - 0.19).abs() < 1e-9);
    }

    #[test]
    fn test_zero_budget_ignored() {
        let meter = CpuLoadMeter::new();
        meter.record(Duration::from_millis(1), Duration::ZERO);
        assert_eq!(meter.load(), 0.0);
    }

    #[test]
    fn test_buffer_duration() {
        assert_eq!(buffer_duration(441, 44100), Duration::from_millis(10));
        assert_eq!(buffer_duration(512, 0), Duration::ZERO);
    }
}
