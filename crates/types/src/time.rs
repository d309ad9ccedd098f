//! Simulation clock type.

use std::fmt;
use std::ops::{Add, AddAssign};
use std::time::Duration;

/// Simulated time: microseconds since the start of the run.
///
/// The scheduler's current date is a `SimTime` and is non-decreasing across
/// the simulation lifetime. Offsets (latencies, timer delays, motion
/// durations) are plain [`Duration`]s, truncated to microsecond granularity
/// when added to a `SimTime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime(u64);

impl SimTime {
    /// The start of the simulation.
    pub const ZERO: SimTime = SimTime(0);

    pub const fn from_micros(micros: u64) -> Self {
        SimTime(micros)
    }

    pub const fn from_millis(millis: u64) -> Self {
        SimTime(millis * 1_000)
    }

    pub const fn from_secs(secs: u64) -> Self {
        SimTime(secs * 1_000_000)
    }

    pub const fn as_micros(self) -> u64 {
        self.0
    }

    /// Convert to a [`Duration`] since the start of the run.
    pub const fn as_duration(self) -> Duration {
        Duration::from_micros(self.0)
    }
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Duration) -> SimTime {
        SimTime(self.0.saturating_add(rhs.as_micros() as u64))
    }
}

impl AddAssign<Duration> for SimTime {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_ordering() {
        assert!(SimTime::from_micros(5) < SimTime::from_micros(10));
        assert_eq!(SimTime::from_millis(1), SimTime::from_micros(1_000));
        assert_eq!(SimTime::from_secs(1), SimTime::from_millis(1_000));
    }

    #[test]
    fn test_duration_offset() {
        let t = SimTime::from_micros(100) + Duration::from_micros(50);
        assert_eq!(t.as_micros(), 150);

        // Sub-microsecond offsets truncate.
        let t = SimTime::ZERO + Duration::from_nanos(999);
        assert_eq!(t, SimTime::ZERO);
    }

    #[test]
    fn test_roundtrip_through_duration() {
        let t = SimTime::from_millis(42);
        assert_eq!(t.as_duration(), Duration::from_millis(42));
    }
}
