use std::ops::{Add, Sub};
use std::time::Duration;

/// Millisecond timestamp on a caller-defined timeline.
///
/// Used wherever timing must be replayable in tests; async code uses
/// `tokio::time::Instant` through the same `Add<Duration>` interface.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeMs(pub u64);

impl TimeMs {
    pub const ZERO: TimeMs = TimeMs(0);

    pub fn as_millis(self) -> u64 {
        self.0
    }

    pub fn saturating_since(self, earlier: TimeMs) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for TimeMs {
    type Output = TimeMs;

    fn add(self, rhs: Duration) -> TimeMs {
        let ms = u64::try_from(rhs.as_millis()).unwrap_or(u64::MAX);
        TimeMs(self.0.saturating_add(ms))
    }
}

impl Sub for TimeMs {
    type Output = Duration;

    fn sub(self, rhs: TimeMs) -> Duration {
        self.saturating_since(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::TimeMs;
    use std::time::Duration;

    #[test]
    fn adds_durations_in_millis() {
        assert_eq!(TimeMs(100) + Duration::from_millis(250), TimeMs(350));
        assert_eq!(TimeMs(u64::MAX) + Duration::from_secs(1), TimeMs(u64::MAX));
    }

    #[test]
    fn subtraction_saturates() {
        assert_eq!(TimeMs(350) - TimeMs(100), Duration::from_millis(250));
        assert_eq!(TimeMs(100) - TimeMs(350), Duration::ZERO);
    }
}
