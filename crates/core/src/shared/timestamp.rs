use std::fmt;
use std::time::Duration;

/// Monotonic capture time reported by the sensor clock, in nanoseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs * 1e9).round() as i64)
    }

    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1e9
    }

    /// Elapsed time since `earlier`, zero if `earlier` is later.
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0).max(0) as u64)
    }
}

impl From<Duration> for Timestamp {
    fn from(d: Duration) -> Self {
        Self(d.as_nanos().min(i64::MAX as u128) as i64)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secs_roundtrip() {
        let t = Timestamp::from_secs_f64(1.25);
        assert_eq!(t.as_nanos(), 1_250_000_000);
        assert_eq!(t.as_secs_f64(), 1.25);
    }

    #[test]
    fn test_ordering() {
        assert!(Timestamp::from_nanos(1) < Timestamp::from_nanos(2));
    }

    #[test]
    fn test_saturating_since() {
        let a = Timestamp::from_nanos(5_000);
        let b = Timestamp::from_nanos(2_000);
        assert_eq!(a.saturating_since(b), Duration::from_nanos(3_000));
        assert_eq!(b.saturating_since(a), Duration::ZERO);
    }

    #[test]
    fn test_from_duration() {
        let t: Timestamp = Duration::from_millis(40).into();
        assert_eq!(t.as_nanos(), 40_000_000);
    }
}
