//! Two-way camera bridge between the tile map and the point overlay.
//!
//! The bridge holds the single authoritative [`ViewState`]. A change reported
//! by either renderer is converted into the other renderer's convention and
//! written there. Writes make the target renderer report a change in turn; that
//! echo carries the state the bridge just wrote, so it compares equal to the
//! authoritative view and is dropped. This is what keeps the loop finite.
//!
//! Conventions:
//! - tile center is EPSG:3857 meters, overlay center is lon/lat degrees
//! - tile zoom is a resolution in meters per pixel
//! - tile rotation is radians counter-clockwise, overlay bearing is degrees
//!   clockwise, so each direction negates exactly once
//! - the tile map cannot tilt; views derived from it have pitch 0

use foundation::math::{lon_lat_to_mercator, mercator_to_lon_lat, normalize_degrees};
use tracing::{debug, trace, warn};

use crate::overlay::OverlayRenderer;
use crate::tile::{TileChange, TileRenderer, TileView};
use crate::view_state::{Tolerance, ViewState};

/// Overlay view derived from the tile map's native camera.
///
/// The tile map may be panned across the antimeridian; such centers are
/// wrapped back into the longitude domain.
pub fn view_from_tile(tile: TileView) -> ViewState {
    let mut center = mercator_to_lon_lat(tile.center);
    if !center.is_valid() {
        center = center.wrapped();
    }
    ViewState {
        longitude: center.lon,
        latitude: center.lat,
        zoom: tile.zoom(),
        pitch: 0.0,
        bearing: normalize_degrees(-tile.rotation.to_degrees()),
    }
}

/// Tile map camera for an overlay view. Pitch has no tile counterpart.
pub fn tile_from_view(view: ViewState) -> TileView {
    TileView::new(
        lon_lat_to_mercator(view.center()),
        view.zoom,
        -view.bearing.to_radians(),
    )
}

/// Result of one bridge pass.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The other renderer was updated to this view.
    Applied(ViewState),
    /// Only the authoritative view changed (overlay pitch); nothing to write.
    Adopted(ViewState),
    /// The reported state already matches; nothing was written.
    Echo,
    /// The reported state was not finite. The reporting renderer was reset to
    /// the authoritative view.
    Rejected,
    /// The bridge is detached; the notification was ignored.
    Detached,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub tile_passes: u64,
    pub overlay_passes: u64,
    pub writes_to_tile: u64,
    pub writes_to_overlay: u64,
    pub echoes: u64,
    pub rejected: u64,
    pub ignored_after_detach: u64,
}

#[derive(Debug)]
pub struct ViewSyncBridge {
    current: ViewState,
    tolerance: Tolerance,
    attached: bool,
    seeded: bool,
    stats: SyncStats,
}

impl ViewSyncBridge {
    pub fn new(initial: ViewState) -> Self {
        Self {
            current: initial.normalized(),
            tolerance: Tolerance::default(),
            attached: true,
            seeded: false,
            stats: SyncStats::default(),
        }
    }

    /// The authoritative view.
    pub fn current(&self) -> ViewState {
        self.current
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Whether `initial_sync` has run.
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Seed the overlay from a freshly initialized tile map.
    ///
    /// Always writes, even when the overlay happens to match already, so the
    /// overlay never draws its first frame from its own default.
    pub fn initial_sync<T, O>(&mut self, tile: &T, overlay: &mut O) -> ViewState
    where
        T: TileRenderer + ?Sized,
        O: OverlayRenderer + ?Sized,
    {
        let view = view_from_tile(tile.view());
        self.current = view;
        self.seeded = true;
        overlay.apply_view_state(view);
        self.stats.writes_to_overlay += 1;
        debug!(
            lon = view.longitude,
            lat = view.latitude,
            zoom = view.zoom,
            "overlay seeded from tile map"
        );
        view
    }

    /// Tile map reported a center, resolution, rotation or interaction-end
    /// change. The handler reads the map's current native state, so the kind
    /// of change only matters for tracing.
    pub fn on_tile_renderer_changed<T, O>(
        &mut self,
        change: TileChange,
        tile: &mut T,
        overlay: &mut O,
    ) -> SyncOutcome
    where
        T: TileRenderer + ?Sized,
        O: OverlayRenderer + ?Sized,
    {
        if !self.attached {
            self.stats.ignored_after_detach += 1;
            return SyncOutcome::Detached;
        }
        self.stats.tile_passes += 1;

        let derived = view_from_tile(tile.view());
        if !derived.is_finite() {
            warn!(?change, view = ?derived, "tile map reported a non-finite view");
            self.stats.rejected += 1;
            tile.set_view(tile_from_view(self.current));
            self.stats.writes_to_tile += 1;
            return SyncOutcome::Rejected;
        }
        if derived.same_planar_view(&self.current, self.tolerance) {
            self.stats.echoes += 1;
            trace!(?change, "tile change is an echo");
            return SyncOutcome::Echo;
        }

        self.current = derived;
        overlay.apply_view_state(derived);
        self.stats.writes_to_overlay += 1;
        debug!(
            ?change,
            lon = derived.longitude,
            lat = derived.latitude,
            zoom = derived.zoom,
            bearing = derived.bearing,
            "tile -> overlay"
        );
        SyncOutcome::Applied(derived)
    }

    /// Overlay controller reported a new view state.
    pub fn on_overlay_renderer_changed<T, O>(
        &mut self,
        reported: ViewState,
        tile: &mut T,
        overlay: &mut O,
    ) -> SyncOutcome
    where
        T: TileRenderer + ?Sized,
        O: OverlayRenderer + ?Sized,
    {
        if !self.attached {
            self.stats.ignored_after_detach += 1;
            return SyncOutcome::Detached;
        }
        self.stats.overlay_passes += 1;

        let reported = reported.normalized();
        if !reported.is_finite() {
            warn!(view = ?reported, "overlay reported a non-finite view");
            self.stats.rejected += 1;
            overlay.apply_view_state(self.current);
            self.stats.writes_to_overlay += 1;
            return SyncOutcome::Rejected;
        }
        if reported.same_view(&self.current, self.tolerance) {
            self.stats.echoes += 1;
            trace!("overlay change is an echo");
            return SyncOutcome::Echo;
        }

        let planar_changed = !reported.same_planar_view(&self.current, self.tolerance);
        self.current = reported;
        if !overlay.view_state().same_view(&reported, self.tolerance) {
            overlay.apply_view_state(reported);
        }
        if !planar_changed {
            debug!(pitch = reported.pitch, "overlay pitch adopted");
            return SyncOutcome::Adopted(reported);
        }

        tile.set_view(tile_from_view(reported));
        self.stats.writes_to_tile += 1;
        debug!(
            lon = reported.longitude,
            lat = reported.latitude,
            zoom = reported.zoom,
            bearing = reported.bearing,
            "overlay -> tile"
        );
        SyncOutcome::Applied(reported)
    }

    /// Stop listening to both renderers and release the tile map's container.
    /// Every later notification is ignored.
    pub fn detach<T, O>(&mut self, tile: &mut T, overlay: &mut O)
    where
        T: TileRenderer + ?Sized,
        O: OverlayRenderer + ?Sized,
    {
        if !self.attached {
            return;
        }
        tile.detach_listener();
        overlay.detach_listener();
        tile.release_container();
        self.attached = false;
        debug!(stats = ?self.stats, "view bridge detached");
    }
}

#[cfg(test)]
mod tests {
    use super::{SyncOutcome, ViewSyncBridge, tile_from_view, view_from_tile};
    use crate::overlay::{OverlayRenderer, PointOverlay};
    use crate::tile::{TileChange, TileMap, TileRenderer, TileView};
    use crate::view_state::{DEFAULT_VIEW, Tolerance, ViewState};
    use foundation::math::{
        LonLat, Mercator, angles_close_degrees, lon_lat_to_mercator, mercator_to_lon_lat,
        normalize_radians,
    };
    use layers::PointStyle;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn renderers() -> (TileMap, PointOverlay) {
        let mut tile = TileMap::new(tile_from_view(DEFAULT_VIEW), (1024, 768));
        let mut overlay = PointOverlay::new(PointStyle::default());
        tile.attach_listener();
        overlay.attach_listener();
        (tile, overlay)
    }

    #[test]
    fn tile_change_converges_overlay() {
        let (mut tile, mut overlay) = renderers();
        let mut bridge = ViewSyncBridge::new(DEFAULT_VIEW);

        let center = LonLat::new(-122.4194, 37.7749);
        tile.pan_to(lon_lat_to_mercator(center));
        tile.zoom_to(11.5);
        tile.rotate_to(0.3);

        let outcome = bridge.on_tile_renderer_changed(TileChange::Center, &mut tile, &mut overlay);
        let view = match outcome {
            SyncOutcome::Applied(v) => v,
            other => panic!("expected applied, got {other:?}"),
        };

        let tile_center = mercator_to_lon_lat(tile.view().center);
        assert_close(view.longitude, tile_center.lon, 1e-9);
        assert_close(view.latitude, tile_center.lat, 1e-9);
        assert_close(view.zoom, tile.view().zoom(), 1e-9);
        assert_close(view.bearing, -tile.view().rotation.to_degrees(), 1e-9);
        assert_eq!(view.pitch, 0.0);
        assert_eq!(overlay.view_state(), view);
        assert_eq!(bridge.current(), view);
    }

    #[test]
    fn overlay_change_converges_tile() {
        let (mut tile, mut overlay) = renderers();
        let mut bridge = ViewSyncBridge::new(DEFAULT_VIEW);

        let reported = ViewState::new(2.3522, 48.8566, 9.25).with_bearing(45.0).with_pitch(30.0);
        overlay.interact(reported);
        let outcome = bridge.on_overlay_renderer_changed(reported, &mut tile, &mut overlay);
        assert!(matches!(outcome, SyncOutcome::Applied(_)));

        let back = view_from_tile(tile.view());
        assert_close(back.longitude, reported.longitude, 1e-9);
        assert_close(back.latitude, reported.latitude, 1e-9);
        assert_close(back.zoom, reported.zoom, 1e-9);
        assert_close(tile.view().rotation, -45f64.to_radians(), 1e-12);
        // Pitch stays on the overlay side only.
        assert_eq!(bridge.current().pitch, 30.0);
        assert_eq!(overlay.view_state().pitch, 30.0);
    }

    #[test]
    fn echo_of_own_write_is_dropped() {
        let (mut tile, mut overlay) = renderers();
        let mut bridge = ViewSyncBridge::new(DEFAULT_VIEW);

        tile.pan_to(lon_lat_to_mercator(LonLat::new(10.0, 10.0)));
        let change = tile.take_notification().expect("center change");
        bridge.on_tile_renderer_changed(change, &mut tile, &mut overlay);

        // The overlay reports the state the bridge just wrote.
        let echoed = overlay.take_notification().expect("overlay echo");
        let outcome = bridge.on_overlay_renderer_changed(echoed, &mut tile, &mut overlay);
        assert_eq!(outcome, SyncOutcome::Echo);
        assert!(!tile.has_pending_notifications());
        assert_eq!(bridge.stats().writes_to_tile, 0);
        assert_eq!(bridge.stats().echoes, 1);
    }

    #[test]
    fn tile_echo_after_overlay_write_is_dropped() {
        let (mut tile, mut overlay) = renderers();
        let mut bridge = ViewSyncBridge::new(DEFAULT_VIEW);

        let reported = ViewState::new(-58.38, -34.6, 6.0).with_bearing(-120.0);
        overlay.interact(reported);
        let note = overlay.take_notification().expect("interaction");
        bridge.on_overlay_renderer_changed(note, &mut tile, &mut overlay);

        let mut passes = 0;
        while let Some(change) = tile.take_notification() {
            passes += 1;
            assert_eq!(
                bridge.on_tile_renderer_changed(change, &mut tile, &mut overlay),
                SyncOutcome::Echo
            );
        }
        assert!(passes > 0);
        assert!(!overlay.has_pending_notifications());
    }

    #[test]
    fn pitch_only_change_does_not_touch_tile() {
        let (mut tile, mut overlay) = renderers();
        let mut bridge = ViewSyncBridge::new(DEFAULT_VIEW);
        let tilted = DEFAULT_VIEW.with_pitch(45.0);
        overlay.interact(tilted);
        let outcome = bridge.on_overlay_renderer_changed(tilted, &mut tile, &mut overlay);
        assert_eq!(outcome, SyncOutcome::Adopted(tilted));
        assert!(!tile.has_pending_notifications());
        assert_eq!(bridge.stats().writes_to_tile, 0);
    }

    #[test]
    fn initial_sync_writes_even_when_equal() {
        let (tile, mut overlay) = renderers();
        let mut bridge = ViewSyncBridge::new(DEFAULT_VIEW);
        assert!(!bridge.is_seeded());
        bridge.initial_sync(&tile, &mut overlay);
        assert!(bridge.is_seeded());
        assert_eq!(bridge.stats().writes_to_overlay, 1);
        assert!(overlay.view_state().same_view(&DEFAULT_VIEW, Tolerance::default()));
    }

    #[test]
    fn detached_bridge_ignores_everything() {
        let (mut tile, mut overlay) = renderers();
        let mut bridge = ViewSyncBridge::new(DEFAULT_VIEW);
        bridge.detach(&mut tile, &mut overlay);
        assert!(!bridge.is_attached());
        assert!(!tile.is_listening());

        tile.pan_to(Mercator::new(5_000.0, 5_000.0));
        assert!(tile.take_notification().is_none());
        let before = overlay.view_state();
        assert_eq!(
            bridge.on_tile_renderer_changed(TileChange::Center, &mut tile, &mut overlay),
            SyncOutcome::Detached
        );
        assert_eq!(
            bridge.on_overlay_renderer_changed(
                ViewState::new(1.0, 1.0, 3.0),
                &mut tile,
                &mut overlay
            ),
            SyncOutcome::Detached
        );
        assert_eq!(overlay.view_state(), before);
        assert_eq!(bridge.stats().ignored_after_detach, 2);
    }

    #[test]
    fn center_past_antimeridian_is_wrapped() {
        let past = lon_lat_to_mercator(LonLat::new(190.0, 0.0));
        let view = view_from_tile(TileView::new(past, 4.0, 0.0));
        assert_close(view.longitude, -170.0, 1e-9);

        let inside = lon_lat_to_mercator(LonLat::new(179.5, 0.0));
        assert_close(view_from_tile(TileView::new(inside, 4.0, 0.0)).longitude, 179.5, 1e-9);
    }

    #[test]
    fn rotation_sign_survives_every_quadrant() {
        let mut deg = -720.0;
        while deg <= 720.0 {
            let rotation = (deg as f64).to_radians();
            let tile = TileView::new(Mercator::default(), 3.0, rotation);
            let view = view_from_tile(tile);
            assert!(view.bearing > -180.0 && view.bearing <= 180.0, "bearing {}", view.bearing);
            assert!(angles_close_degrees(view.bearing, -deg, 1e-9), "deg {deg}");

            let back = tile_from_view(view);
            assert_close(normalize_radians(back.rotation - rotation), 0.0, 1e-9);
            deg += 15.0;
        }
    }

    #[test]
    fn random_ping_pong_never_drifts() {
        let mut rng = StdRng::seed_from_u64(7);
        let (mut tile, mut overlay) = renderers();
        let mut bridge = ViewSyncBridge::new(DEFAULT_VIEW);

        for _ in 0..500 {
            let view = ViewState::new(
                rng.gen_range(-180.0..=180.0),
                rng.gen_range(-85.0..=85.0),
                rng.gen_range(0.0..20.0),
            )
            .with_bearing(rng.gen_range(-180.0..180.0));

            overlay.interact(view);
            let note = overlay.take_notification().expect("interaction");
            bridge.on_overlay_renderer_changed(note, &mut tile, &mut overlay);
            while let Some(change) = tile.take_notification() {
                bridge.on_tile_renderer_changed(change, &mut tile, &mut overlay);
            }
            while let Some(note) = overlay.take_notification() {
                bridge.on_overlay_renderer_changed(note, &mut tile, &mut overlay);
            }

            let from_tile = view_from_tile(tile.view());
            assert!(from_tile.same_planar_view(&overlay.view_state(), Tolerance::default()));
        }
        assert_eq!(bridge.stats().writes_to_tile, 500);
        assert_eq!(bridge.stats().writes_to_overlay, 0);
    }

    #[test]
    fn non_finite_overlay_view_is_rejected_and_reset() {
        let (mut tile, mut overlay) = renderers();
        let mut bridge = ViewSyncBridge::new(DEFAULT_VIEW);
        let tile_before = tile.view();

        overlay.interact(ViewState::new(f64::NAN, 10.0, 5.0));
        let note = overlay.take_notification().expect("interaction");
        assert_eq!(
            bridge.on_overlay_renderer_changed(note, &mut tile, &mut overlay),
            SyncOutcome::Rejected
        );
        assert_eq!(bridge.current(), DEFAULT_VIEW);
        assert_eq!(tile.view(), tile_before);
        assert!(!tile.has_pending_notifications());
        assert!(overlay.view_state().same_view(&DEFAULT_VIEW, Tolerance::default()));

        // The reset reaches the bridge as an ordinary echo.
        let reset = overlay.take_notification().expect("reset");
        assert_eq!(
            bridge.on_overlay_renderer_changed(reset, &mut tile, &mut overlay),
            SyncOutcome::Echo
        );
        assert_eq!(bridge.stats().rejected, 1);
        assert_eq!(bridge.stats().writes_to_tile, 0);
    }

    #[test]
    fn non_finite_tile_view_is_rejected_and_reset() {
        let (mut tile, mut overlay) = renderers();
        let mut bridge = ViewSyncBridge::new(DEFAULT_VIEW);
        let overlay_before = overlay.view_state();

        tile.pan_to(Mercator::new(f64::NAN, 0.0));
        let change = tile.take_notification().expect("center change");
        assert_eq!(
            bridge.on_tile_renderer_changed(change, &mut tile, &mut overlay),
            SyncOutcome::Rejected
        );
        assert!(tile.view().center.x.is_finite());
        assert_eq!(overlay.view_state(), overlay_before);
        assert!(!overlay.has_pending_notifications());

        while let Some(change) = tile.take_notification() {
            assert_eq!(
                bridge.on_tile_renderer_changed(change, &mut tile, &mut overlay),
                SyncOutcome::Echo
            );
        }
        assert_eq!(bridge.current(), DEFAULT_VIEW);
    }
}
