use std::ops::Add;
use std::time::Duration;

use foundation::time::TimeMs;
use runtime::debounce::{Debouncer, Submit};
use streaming::PointRecord;
use tracing::debug;

use crate::points::{FeatureBatch, FeatureSink};

/// Quiet period before a received batch is pushed to the overlay.
pub const DEFAULT_UPDATE_WINDOW: Duration = Duration::from_millis(250);

/// Republishes incoming record batches to a point layer, debounced.
///
/// Only the most recent batch of a burst is converted and applied. Conversion
/// happens at fire time so superseded batches cost nothing beyond their
/// decode. The sink always receives a complete batch in one call.
#[derive(Debug)]
pub struct OverlayUpdater<I = TimeMs> {
    pending: Debouncer<Vec<PointRecord>, I>,
    applied: u64,
}

impl<I> OverlayUpdater<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    pub fn new(window: Duration) -> Self {
        Self {
            pending: Debouncer::new(window),
            applied: 0,
        }
    }

    /// Accept a new batch, replacing any batch still waiting.
    pub fn submit(&mut self, records: Vec<PointRecord>, now: I) -> Submit {
        let len = records.len();
        let outcome = self.pending.submit(records, now);
        debug!(records = len, ?outcome, "overlay batch submitted");
        outcome
    }

    /// When the next update is due, if one is pending.
    pub fn deadline(&self) -> Option<I> {
        self.pending.deadline()
    }

    /// Apply the pending batch if its quiet period has elapsed.
    ///
    /// Returns the number of features now shown.
    pub fn poll<S: FeatureSink + ?Sized>(&mut self, now: I, sink: &mut S) -> Option<usize> {
        let records = self.pending.poll(now)?;
        let batch = FeatureBatch::from_records(&records);
        let len = batch.len();
        sink.replace_features(batch);
        self.applied += 1;
        debug!(features = len, applied = self.applied, "overlay updated");
        Some(len)
    }

    /// Stop for good: the pending batch is dropped and later submits are ignored.
    pub fn cancel(&mut self) {
        if let Some(dropped) = self.pending.cancel() {
            debug!(records = dropped.len(), "pending overlay batch dropped on cancel");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.pending.is_cancelled()
    }

    /// Updates applied to the sink.
    pub fn applied(&self) -> u64 {
        self.applied
    }

    /// Batches replaced before they were shown.
    pub fn superseded(&self) -> u64 {
        self.pending.superseded()
    }
}
