//! Wire format of the vessel push stream.
//!
//! Every message is one complete batch: a JSON array of [`PointRecord`]
//! objects carried in a single WebSocket text frame. There is no envelope,
//! no sequence number and no schema version; the transport's message
//! boundaries are the only framing.

use std::time::Duration;

use foundation::math::LonLat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Icon attribute attached to generated records.
pub const DEFAULT_ICON_URL: &str = "./arrow.png";

/// One simulated vessel position.
///
/// Ids are only unique inside a batch; the feed makes no promise that the
/// same id refers to the same vessel in the next batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointRecord {
    pub id: u64,
    pub longitude: f64,
    pub latitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl PointRecord {
    pub fn new(id: u64, longitude: f64, latitude: f64) -> Self {
        Self {
            id,
            longitude,
            latitude,
            icon_url: None,
            color: None,
        }
    }

    pub fn with_icon(mut self, icon_url: impl Into<String>) -> Self {
        self.icon_url = Some(icon_url.into());
        self
    }

    pub fn lon_lat(&self) -> LonLat {
        LonLat::new(self.longitude, self.latitude)
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("malformed batch payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("record {id} has out-of-range position ({longitude}, {latitude})")]
    OutOfRange {
        id: u64,
        longitude: f64,
        latitude: f64,
    },
}

/// Serialize one batch into a single text message.
pub fn encode_batch(records: &[PointRecord]) -> Result<String, FeedError> {
    Ok(serde_json::to_string(records)?)
}

/// Parse one text message into a batch.
///
/// The whole message is rejected if any record lies outside the WGS84
/// domain; a partially valid batch is never returned.
pub fn decode_batch(text: &str) -> Result<Vec<PointRecord>, FeedError> {
    let records: Vec<PointRecord> = serde_json::from_str(text)?;
    if let Some(bad) = records.iter().find(|r| !r.lon_lat().is_valid()) {
        return Err(FeedError::OutOfRange {
            id: bad.id,
            longitude: bad.longitude,
            latitude: bad.latitude,
        });
    }
    Ok(records)
}

/// Feed generation settings, fixed per deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    /// Delay between two batches on one connection.
    pub interval_ms: u64,

    /// Records per batch.
    pub batch_size: usize,

    /// Icon attribute stamped on every record.
    pub icon_url: String,
}

impl FeedConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2_000,
            batch_size: 100_000,
            icon_url: DEFAULT_ICON_URL.to_string(),
        }
    }
}
