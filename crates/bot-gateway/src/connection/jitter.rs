//! Randomized delays
//!
//! Reconnect and invalid-session waits are drawn from configurable ranges through an
//! injectable random source.

use rand::Rng;
use std::time::Duration;

/// Source of uniformly distributed integers
pub trait RandomSource: Send {
    /// A value in `low..=high`
    fn next_u64_in(&mut self, low: u64, high: u64) -> u64;
}

/// Thread-local RNG from `rand`
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_u64_in(&mut self, low: u64, high: u64) -> u64 {
        rand::thread_rng().gen_range(low..=high)
    }
}

/// Always returns the same offset into the range, clamped to it
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub u64);

impl RandomSource for FixedRandom {
    fn next_u64_in(&mut self, low: u64, high: u64) -> u64 {
        low.saturating_add(self.0).min(high)
    }
}

/// Inclusive range of delays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterRange {
    min: Duration,
    max: Duration,
}

impl JitterRange {
    /// Build a range from millisecond bounds; swapped bounds are reordered
    #[must_use]
    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        let (low, high) = if min_ms <= max_ms {
            (min_ms, max_ms)
        } else {
            (max_ms, min_ms)
        };
        Self {
            min: Duration::from_millis(low),
            max: Duration::from_millis(high),
        }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Default wait before reconnecting after an abnormal close
    #[must_use]
    pub fn reconnect() -> Self {
        Self::from_millis(1_000, 6_000)
    }

    /// Default wait before re-authenticating after INVALID_SESSION
    #[must_use]
    pub fn invalid_session() -> Self {
        Self::from_millis(2_000, 5_000)
    }

    /// Draw a delay from the range
    pub fn sample(&self, rng: &mut dyn RandomSource) -> Duration {
        let a = u64::try_from(self.min.as_millis()).unwrap_or(u64::MAX);
        let b = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);
        // `gen_range` panics on an empty range
        let (low, high) = (a.min(b), a.max(b));
        Duration::from_millis(rng.next_u64_in(low, high))
    }
}
