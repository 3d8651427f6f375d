//! Tile map model: a 2D basemap camera in projected coordinates.

use foundation::math::{
    MERCATOR_HALF_EXTENT, Mercator, TileCoord, approx_eq, mercator_to_lon_lat,
    resolution_for_zoom, tiles_covering, zoom_for_resolution,
};
use runtime::event_bus::EventBus;
use tracing::debug;

use crate::session::{ContainerHost, InitError};

/// Deepest zoom the basemap has tiles for.
pub const MAX_TILE_ZOOM: u8 = 19;

/// Native camera of the tile map.
///
/// `rotation` is in radians, counter-clockwise positive, which is the opposite
/// sense of the overlay's bearing.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TileView {
    pub center: Mercator,
    /// Meters per pixel.
    pub resolution: f64,
    pub rotation: f64,
}

impl TileView {
    pub fn new(center: Mercator, zoom: f64, rotation: f64) -> Self {
        Self {
            center,
            resolution: resolution_for_zoom(zoom),
            rotation,
        }
    }

    pub fn zoom(&self) -> f64 {
        zoom_for_resolution(self.resolution)
    }
}

/// Which property of the tile map changed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TileChange {
    Center,
    Resolution,
    Rotation,
    /// A pan/zoom/rotate gesture finished.
    InteractionEnd,
}

/// What the bridge needs from a tile renderer.
pub trait TileRenderer {
    fn view(&self) -> TileView;

    /// Programmatic camera write. Emits a notification for each property
    /// that actually changed, just like a user gesture would.
    fn set_view(&mut self, view: TileView);

    fn attach_listener(&mut self);

    fn detach_listener(&mut self);

    fn take_notification(&mut self) -> Option<TileChange>;

    fn has_pending_notifications(&self) -> bool;

    /// Detach from the host container. The renderer must not be drawn after.
    fn release_container(&mut self);
}

/// In-process tile map with zoom limits and a viewport.
#[derive(Debug)]
pub struct TileMap {
    view: TileView,
    min_zoom: f64,
    max_zoom: f64,
    viewport_px: (u32, u32),
    target: Option<String>,
    listening: bool,
    changes: EventBus<TileChange>,
}

impl TileMap {
    pub fn new(view: TileView, viewport_px: (u32, u32)) -> Self {
        Self {
            view,
            min_zoom: 0.0,
            max_zoom: 28.0,
            viewport_px,
            target: None,
            listening: false,
            changes: EventBus::new(),
        }
    }

    pub fn with_zoom_limits(mut self, min_zoom: f64, max_zoom: f64) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        let view = self.constrain(self.view);
        self.view = view;
        self
    }

    /// Bind the map to a host element. Fails when the element does not exist.
    pub fn attach_to<H: ContainerHost + ?Sized>(
        &mut self,
        target: &str,
        host: &H,
    ) -> Result<(), InitError> {
        if !host.has_container(target) {
            return Err(InitError::MissingContainer(target.to_string()));
        }
        self.target = Some(target.to_string());
        debug!(container = %target, "tile map attached");
        Ok(())
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn viewport_px(&self) -> (u32, u32) {
        self.viewport_px
    }

    /// User drag to a new center.
    pub fn pan_to(&mut self, center: Mercator) {
        let next = TileView { center, ..self.view };
        self.update(next);
    }

    /// User wheel/pinch to a new zoom.
    pub fn zoom_to(&mut self, zoom: f64) {
        let next = TileView {
            resolution: resolution_for_zoom(zoom),
            ..self.view
        };
        self.update(next);
    }

    /// User rotation gesture (radians, counter-clockwise positive).
    pub fn rotate_to(&mut self, rotation: f64) {
        let next = TileView {
            rotation,
            ..self.view
        };
        self.update(next);
    }

    pub fn end_interaction(&mut self) {
        self.emit(TileChange::InteractionEnd);
    }

    /// Tiles needed to cover the viewport at the nearest integer zoom.
    pub fn visible_tiles(&self) -> Vec<TileCoord> {
        let z = self.view.zoom().round().clamp(0.0, MAX_TILE_ZOOM as f64) as u8;
        let half_w = self.viewport_px.0 as f64 / 2.0 * self.view.resolution;
        let half_h = self.viewport_px.1 as f64 / 2.0 * self.view.resolution;
        let (sin, cos) = self.view.rotation.sin_cos();
        let ext_x = cos.abs() * half_w + sin.abs() * half_h;
        let ext_y = sin.abs() * half_w + cos.abs() * half_h;

        let c = self.view.center;
        let clamp = |v: f64| v.clamp(-MERCATOR_HALF_EXTENT, MERCATOR_HALF_EXTENT);
        let min = Mercator::new(clamp(c.x - ext_x), clamp(c.y - ext_y));
        let max = Mercator::new(clamp(c.x + ext_x), clamp(c.y + ext_y));
        tiles_covering(min, max, z)
    }

    fn constrain(&self, mut view: TileView) -> TileView {
        let zoom = view.zoom().clamp(self.min_zoom, self.max_zoom);
        if !approx_eq(zoom, view.zoom(), 1e-12) {
            view.resolution = resolution_for_zoom(zoom);
        }
        // The projected world is square; keep the center on it vertically.
        view.center.y = view.center.y.clamp(-MERCATOR_HALF_EXTENT, MERCATOR_HALF_EXTENT);
        view
    }

    fn update(&mut self, next: TileView) {
        let next = self.constrain(next);
        let prev = self.view;
        self.view = next;
        if prev.center != next.center {
            self.emit(TileChange::Center);
        }
        if prev.resolution != next.resolution {
            self.emit(TileChange::Resolution);
        }
        if prev.rotation != next.rotation {
            self.emit(TileChange::Rotation);
        }
    }

    fn emit(&mut self, change: TileChange) {
        if self.listening {
            self.changes.emit(change);
        }
    }
}

impl TileRenderer for TileMap {
    fn view(&self) -> TileView {
        self.view
    }

    fn set_view(&mut self, view: TileView) {
        self.update(view);
    }

    fn attach_listener(&mut self) {
        self.listening = true;
    }

    fn detach_listener(&mut self) {
        self.listening = false;
        self.changes.clear();
    }

    fn take_notification(&mut self) -> Option<TileChange> {
        self.changes.pop().map(|e| e.payload)
    }

    fn has_pending_notifications(&self) -> bool {
        !self.changes.is_empty()
    }

    fn release_container(&mut self) {
        if let Some(target) = self.target.take() {
            let center = mercator_to_lon_lat(self.view.center);
            debug!(container = %target, lon = center.lon, lat = center.lat, "tile map released");
        }
    }
}
