use std::ops::Add;
use std::time::Duration;

use foundation::time::TimeMs;

/// State of a [`Debouncer`].
#[derive(Debug, Clone, PartialEq)]
pub enum DebounceState<T, I> {
    Idle,
    Pending { value: T, deadline: I },
}

/// What happened to a value handed to [`Debouncer::submit`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Submit {
    /// Nothing was pending; a new deadline was armed.
    Armed,
    /// A pending value was replaced and the deadline pushed back.
    Superseded,
    /// The debouncer was cancelled; the value was dropped.
    Rejected,
}

/// Trailing-edge debounce as an explicit state machine.
///
/// `submit` stores the latest value and re-arms the deadline to
/// `now + window`. `poll` releases the stored value once the deadline has
/// passed. A burst of submits therefore produces exactly one release, carrying
/// the last value, `window` after the last submit.
///
/// The debouncer never reads a clock itself. Callers pass `now`, which keeps it
/// usable with `TimeMs` in tests and with `tokio::time::Instant` in async code.
#[derive(Debug, Clone)]
pub struct Debouncer<T, I = TimeMs> {
    window: Duration,
    state: DebounceState<T, I>,
    cancelled: bool,
    superseded: u64,
    fired: u64,
}

impl<T, I> Debouncer<T, I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: DebounceState::Idle,
            cancelled: false,
            superseded: 0,
            fired: 0,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn state(&self) -> &DebounceState<T, I> {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, DebounceState::Pending { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Deadline of the pending value, if any.
    pub fn deadline(&self) -> Option<I> {
        match &self.state {
            DebounceState::Idle => None,
            DebounceState::Pending { deadline, .. } => Some(*deadline),
        }
    }

    pub fn submit(&mut self, value: T, now: I) -> Submit {
        if self.cancelled {
            return Submit::Rejected;
        }
        let deadline = now + self.window;
        let pending = DebounceState::Pending { value, deadline };
        let previous = std::mem::replace(&mut self.state, pending);
        match previous {
            DebounceState::Idle => Submit::Armed,
            DebounceState::Pending { .. } => {
                self.superseded += 1;
                Submit::Superseded
            }
        }
    }

    /// Release the pending value if its deadline is at or before `now`.
    pub fn poll(&mut self, now: I) -> Option<T> {
        match &self.state {
            DebounceState::Pending { deadline, .. } if *deadline <= now => {}
            _ => return None,
        }
        match std::mem::replace(&mut self.state, DebounceState::Idle) {
            DebounceState::Pending { value, .. } => {
                self.fired += 1;
                Some(value)
            }
            DebounceState::Idle => None,
        }
    }

    /// Drop any pending value and refuse all future submits.
    pub fn cancel(&mut self) -> Option<T> {
        self.cancelled = true;
        match std::mem::replace(&mut self.state, DebounceState::Idle) {
            DebounceState::Pending { value, .. } => Some(value),
            DebounceState::Idle => None,
        }
    }

    /// Number of values replaced before they could fire.
    pub fn superseded(&self) -> u64 {
        self.superseded
    }

    /// Number of values released by `poll`.
    pub fn fired(&self) -> u64 {
        self.fired
    }
}

#[cfg(test)]
mod tests {
    use super::{DebounceState, Debouncer, Submit};
    use foundation::time::TimeMs;
    use std::time::Duration;

    const WINDOW: Duration = Duration::from_millis(250);

    /// Feed `(time, value)` submits and poll every millisecond until `until`.
    fn simulate(submits: &[(u64, &'static str)], until: u64) -> Vec<(u64, &'static str)> {
        let mut d: Debouncer<&'static str> = Debouncer::new(WINDOW);
        let mut fired = Vec::new();
        for t in 0..=until {
            for (at, value) in submits {
                if *at == t {
                    d.submit(*value, TimeMs(t));
                }
            }
            if let Some(v) = d.poll(TimeMs(t)) {
                fired.push((t, v));
            }
        }
        fired
    }

    #[test]
    fn burst_collapses_into_one_release_with_latest_value() {
        let fired = simulate(&[(0, "b1"), (100, "b2")], 1_000);
        assert_eq!(fired, vec![(350, "b2")]);
    }

    #[test]
    fn spaced_submits_each_release() {
        let fired = simulate(&[(0, "b1"), (400, "b2")], 1_000);
        assert_eq!(fired, vec![(250, "b1"), (650, "b2")]);
    }

    #[test]
    fn submit_reports_supersede() {
        let mut d: Debouncer<u32> = Debouncer::new(WINDOW);
        assert_eq!(d.submit(1, TimeMs(0)), Submit::Armed);
        assert_eq!(d.submit(2, TimeMs(10)), Submit::Superseded);
        assert_eq!(d.deadline(), Some(TimeMs(260)));
        assert_eq!(d.superseded(), 1);
        assert_eq!(d.poll(TimeMs(259)), None);
        assert_eq!(d.poll(TimeMs(260)), Some(2));
        assert_eq!(d.fired(), 1);
        assert_eq!(*d.state(), DebounceState::Idle);
        assert_eq!(d.poll(TimeMs(10_000)), None);
    }

    #[test]
    fn cancel_drops_pending_and_blocks_rearm() {
        let mut d: Debouncer<u32> = Debouncer::new(WINDOW);
        d.submit(1, TimeMs(0));
        assert_eq!(d.cancel(), Some(1));
        assert!(d.is_cancelled());
        assert_eq!(d.submit(2, TimeMs(1)), Submit::Rejected);
        assert!(!d.is_pending());
        assert_eq!(d.poll(TimeMs(1_000)), None);
    }
}
