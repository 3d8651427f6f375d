//! Async driver for the debounced overlay updater.

use std::future::Future;
use std::time::Duration;

use layers::{FeatureSink, OverlayUpdater};
use streaming::PointRecord;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

/// Why the update loop returned.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stop {
    FeedClosed,
    Shutdown,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct UpdateStats {
    pub received: u64,
    pub superseded: u64,
    pub applied: u64,
}

/// Feed decoded batches into the point layer, at most one update per quiet
/// period of `window`.
///
/// `on_applied` runs right after each replacement with the new feature count.
/// A batch whose quiet period has already run out is applied before the next
/// received batch is looked at. When `shutdown` resolves or the feed channel
/// closes, the pending batch is dropped and nothing is applied afterwards.
pub async fn run_overlay_updates<S, F>(
    window: Duration,
    mut batches: mpsc::Receiver<Vec<PointRecord>>,
    sink: &mut S,
    mut on_applied: F,
    shutdown: impl Future<Output = ()>,
) -> (Stop, UpdateStats)
where
    S: FeatureSink + ?Sized,
    F: FnMut(&mut S, usize),
{
    let mut updater: OverlayUpdater<Instant> = OverlayUpdater::new(window);
    let mut received = 0;
    tokio::pin!(shutdown);

    let stop = loop {
        let deadline = updater.deadline();
        let fire = async {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = &mut shutdown => break Stop::Shutdown,
            _ = fire => {
                if let Some(count) = updater.poll(Instant::now(), &mut *sink) {
                    on_applied(&mut *sink, count);
                }
            }
            msg = batches.recv() => match msg {
                Some(records) => {
                    received += 1;
                    updater.submit(records, Instant::now());
                }
                None => break Stop::FeedClosed,
            },
        }
    };

    updater.cancel();
    let stats = UpdateStats {
        received,
        superseded: updater.superseded(),
        applied: updater.applied(),
    };
    debug!(?stop, ?stats, "overlay updates stopped");
    info!(applied = stats.applied, superseded = stats.superseded, "overlay updater cancelled");
    (stop, stats)
}
