//! Map session: both renderers, the bridge, and their lifecycle.

use std::collections::HashSet;

use layers::{FeatureBatch, FeatureSink, PointStyle};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::bridge::{SyncStats, ViewSyncBridge, tile_from_view};
use crate::overlay::{OverlayFrame, OverlayRenderer, PointOverlay};
use crate::tile::{TileMap, TileRenderer};
use crate::view_state::{DEFAULT_VIEW, ViewState};

/// Where renderers can be mounted.
pub trait ContainerHost {
    fn has_container(&self, id: &str) -> bool;
}

impl ContainerHost for HashSet<String> {
    fn has_container(&self, id: &str) -> bool {
        self.contains(id)
    }
}

impl ContainerHost for [&str] {
    fn has_container(&self, id: &str) -> bool {
        self.iter().any(|c| *c == id)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum InitError {
    #[error("map container `{0}` does not exist")]
    MissingContainer(String),
    #[error("viewport {width}x{height} has no area")]
    InvalidViewport { width: u32, height: u32 },
    #[error("initial view has non-finite fields")]
    InvalidView,
}

#[derive(Debug, Clone)]
pub struct MapOptions {
    pub target: String,
    pub initial: ViewState,
    pub viewport_px: (u32, u32),
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub style: PointStyle,
    /// Upper bound on bridge passes per `pump`.
    pub max_sync_passes: usize,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            target: "map".to_string(),
            initial: DEFAULT_VIEW,
            viewport_px: (1280, 720),
            min_zoom: 0.0,
            max_zoom: 22.0,
            style: PointStyle::default(),
            max_sync_passes: 16,
        }
    }
}

impl MapOptions {
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }
}

/// Bridge activity during one `pump`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PumpReport {
    pub passes: u64,
    pub writes: u64,
    /// True when the pass bound was hit with notifications still queued.
    pub truncated: bool,
}

#[derive(Debug)]
pub struct MapSession {
    tile: TileMap,
    overlay: PointOverlay,
    bridge: ViewSyncBridge,
    max_passes: usize,
}

impl MapSession {
    /// Initialize the tile map in `options.target`, then the overlay, then
    /// seed the overlay from the tile map before either starts listening.
    pub fn mount<H: ContainerHost + ?Sized>(
        host: &H,
        options: MapOptions,
    ) -> Result<Self, InitError> {
        let (width, height) = options.viewport_px;
        if width == 0 || height == 0 {
            return Err(InitError::InvalidViewport { width, height });
        }
        if !options.initial.is_finite() {
            return Err(InitError::InvalidView);
        }

        let initial = options.initial.normalized();
        let mut tile = TileMap::new(tile_from_view(initial), options.viewport_px)
            .with_zoom_limits(options.min_zoom, options.max_zoom);
        tile.attach_to(&options.target, host)?;

        let mut overlay = PointOverlay::new(options.style);
        let mut bridge = ViewSyncBridge::new(initial);
        let seeded = bridge.initial_sync(&tile, &mut overlay);

        tile.attach_listener();
        overlay.attach_listener();
        info!(
            container = %options.target,
            lon = seeded.longitude,
            lat = seeded.latitude,
            zoom = seeded.zoom,
            "map session mounted"
        );

        Ok(Self {
            tile,
            overlay,
            bridge,
            max_passes: options.max_sync_passes.max(1),
        })
    }

    /// Run queued renderer notifications through the bridge until both
    /// renderers are quiet or the pass bound is reached.
    ///
    /// Notifications from one renderer are coalesced into a single pass since
    /// the bridge only reads the latest state.
    pub fn pump(&mut self) -> PumpReport {
        let before = self.bridge.stats();
        let mut passes = 0usize;

        while passes < self.max_passes {
            let mut progressed = false;

            if let Some(change) = drain_last(|| self.tile.take_notification()) {
                self.bridge
                    .on_tile_renderer_changed(change, &mut self.tile, &mut self.overlay);
                passes += 1;
                progressed = true;
            }
            if passes >= self.max_passes {
                break;
            }
            if let Some(reported) = drain_last(|| self.overlay.take_notification()) {
                self.bridge
                    .on_overlay_renderer_changed(reported, &mut self.tile, &mut self.overlay);
                passes += 1;
                progressed = true;
            }

            if !progressed {
                break;
            }
        }

        let truncated =
            self.tile.has_pending_notifications() || self.overlay.has_pending_notifications();
        if truncated {
            warn!(passes, "view sync did not settle within pass bound");
        }

        let after = self.bridge.stats();
        PumpReport {
            passes: passes as u64,
            writes: (after.writes_to_tile - before.writes_to_tile)
                + (after.writes_to_overlay - before.writes_to_overlay),
            truncated,
        }
    }

    pub fn view(&self) -> ViewState {
        self.bridge.current()
    }

    pub fn stats(&self) -> SyncStats {
        self.bridge.stats()
    }

    pub fn tile(&self) -> &TileMap {
        &self.tile
    }

    pub fn tile_mut(&mut self) -> &mut TileMap {
        &mut self.tile
    }

    pub fn overlay(&self) -> &PointOverlay {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut PointOverlay {
        &mut self.overlay
    }

    pub fn is_mounted(&self) -> bool {
        self.bridge.is_attached()
    }

    /// Draw one overlay frame. Nothing is drawn once unmounted.
    pub fn render_frame(&mut self) -> Option<OverlayFrame> {
        if !self.is_mounted() {
            return None;
        }
        Some(self.overlay.render_frame())
    }

    /// Detach both listeners and release the container. Idempotent.
    pub fn unmount(&mut self) {
        if !self.is_mounted() {
            return;
        }
        self.bridge.detach(&mut self.tile, &mut self.overlay);
        debug!(frames = self.overlay.frames_rendered(), "map session unmounted");
    }
}

impl FeatureSink for MapSession {
    fn replace_features(&mut self, batch: FeatureBatch) {
        if self.is_mounted() {
            self.overlay.replace_features(batch);
        }
    }
}

fn drain_last<T>(mut next: impl FnMut() -> Option<T>) -> Option<T> {
    let mut last = None;
    while let Some(item) = next() {
        last = Some(item);
    }
    last
}
