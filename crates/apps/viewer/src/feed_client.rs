//! Push-stream listener.
//!
//! Connects once, decodes every text message into a batch and forwards it to
//! the overlay updater. Malformed messages are logged and dropped. There is no
//! reconnect: when the stream ends the client returns.

use std::future::Future;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use streaming::{FeedError, PointRecord, decode_batch};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// One inbound message, classified.
#[derive(Debug)]
pub enum Incoming {
    Batch(Vec<PointRecord>),
    Malformed(FeedError),
    Closed,
    /// Binary, ping and pong frames carry nothing for the overlay.
    Ignored,
}

pub fn classify(msg: Message) -> Incoming {
    match msg {
        Message::Text(text) => match decode_batch(&text) {
            Ok(records) => Incoming::Batch(records),
            Err(err) => Incoming::Malformed(err),
        },
        Message::Close(_) => Incoming::Closed,
        _ => Incoming::Ignored,
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub batches: u64,
    pub dropped: u64,
}

/// Listen on `url` until the server goes away, the updater stops taking
/// batches, or `shutdown` resolves. On shutdown a close frame is sent.
pub async fn listen(
    url: &str,
    batches: mpsc::Sender<Vec<PointRecord>>,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<FeedStats> {
    let (socket, _) = connect_async(url)
        .await
        .with_context(|| format!("failed to connect to feed at {url}"))?;
    info!(url, "feed connected");

    let (mut write, mut read) = socket.split();
    let mut stats = FeedStats::default();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                if let Err(err) = write.send(Message::Close(None)).await {
                    debug!("close frame not sent: {err}");
                }
                break;
            }
            msg = read.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(err)) => {
                        warn!("feed receive error: {err}");
                        break;
                    }
                    None => break,
                };
                match classify(msg) {
                    Incoming::Batch(records) => {
                        debug!(records = records.len(), "batch received");
                        if batches.send(records).await.is_err() {
                            debug!("overlay updater gone");
                            break;
                        }
                        stats.batches += 1;
                    }
                    Incoming::Malformed(err) => {
                        stats.dropped += 1;
                        warn!(dropped = stats.dropped, "dropping feed message: {err}");
                    }
                    Incoming::Closed => {
                        info!("feed closed by server");
                        break;
                    }
                    Incoming::Ignored => {}
                }
            }
        }
    }

    info!(batches = stats.batches, dropped = stats.dropped, "feed disconnected");
    Ok(stats)
}
