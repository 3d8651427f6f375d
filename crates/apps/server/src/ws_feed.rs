//! Per-connection push loop.
//!
//! Each connected listener gets its own timer and generator. Every tick one
//! complete batch is encoded and sent as a single text message. The loop ends
//! as soon as the listener goes away, and the timer goes with it.

use std::fmt::Display;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{pin_mut, Sink, SinkExt, Stream, StreamExt};
use rand::Rng;
use streaming::encode_batch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::generator::PointGenerator;

/// What the listener sent us. The feed only cares whether it is leaving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Close,
    Other,
}

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Close frame from the listener.
    Closed,
    /// The inbound stream ended without a close frame.
    StreamEnded,
    ReceiveError(String),
    SendFailed(String),
    EncodeFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub batches_sent: u64,
    pub end: SessionEnd,
}

pub struct FeedSession<R> {
    id: Uuid,
    interval: Duration,
    generator: PointGenerator<R>,
}

impl<R: Rng> FeedSession<R> {
    pub fn new(interval: Duration, generator: PointGenerator<R>) -> Self {
        Self {
            id: Uuid::new_v4(),
            interval,
            generator,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Push batches into `outbound` until the listener leaves.
    ///
    /// The first batch goes out one interval after the call, not immediately.
    pub async fn run<Tx, Rx, E>(mut self, outbound: Tx, inbound: Rx) -> SessionSummary
    where
        Tx: Sink<String>,
        Tx::Error: Display,
        Rx: Stream<Item = Result<Inbound, E>>,
        E: Display,
    {
        pin_mut!(outbound);
        pin_mut!(inbound);

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut batches_sent = 0u64;
        info!(
            session = %self.id,
            interval_ms = self.interval.as_millis() as u64,
            batch_size = self.generator.batch_size(),
            "listener connected"
        );

        let end = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let batch = self.generator.batch();
                    let text = match encode_batch(&batch) {
                        Ok(text) => text,
                        Err(err) => {
                            error!(session = %self.id, "batch encoding failed: {err}");
                            break SessionEnd::EncodeFailed(err.to_string());
                        }
                    };
                    if let Err(err) = outbound.send(text).await {
                        warn!(session = %self.id, "send failed: {err}");
                        break SessionEnd::SendFailed(err.to_string());
                    }
                    batches_sent += 1;
                    debug!(session = %self.id, records = batch.len(), batches_sent, "batch sent");
                }
                msg = inbound.next() => match msg {
                    Some(Ok(Inbound::Close)) => break SessionEnd::Closed,
                    Some(Ok(Inbound::Other)) => {}
                    Some(Err(err)) => {
                        warn!(session = %self.id, "receive error: {err}");
                        break SessionEnd::ReceiveError(err.to_string());
                    }
                    None => break SessionEnd::StreamEnded,
                },
            }
        };

        info!(session = %self.id, batches_sent, reason = ?end, "listener disconnected");
        SessionSummary { batches_sent, end }
    }
}

/// Adapt an upgraded axum socket to the session loop.
pub async fn serve_socket<R: Rng>(socket: WebSocket, session: FeedSession<R>) -> SessionSummary {
    let (sink, stream) = socket.split();
    let outbound =
        sink.with(|text: String| async move { Ok::<_, axum::Error>(Message::Text(text)) });
    let inbound = stream.map(|msg| {
        msg.map(|m| match m {
            Message::Close(_) => Inbound::Close,
            _ => Inbound::Other,
        })
    });
    session.run(outbound, inbound).await
}
