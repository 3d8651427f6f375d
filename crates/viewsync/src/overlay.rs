//! GPU point overlay model: its own tilting camera plus one point layer.

use foundation::math::lon_lat_to_mercator;
use layers::{FeatureBatch, FeatureSink, Layer, PointInstance, PointLayer, PointStyle};
use runtime::event_bus::EventBus;

use crate::view_state::{Tolerance, ViewState};

/// Pitch limit of the overlay controller.
pub const MAX_PITCH: f64 = 85.0;

/// What the bridge needs from an overlay renderer.
pub trait OverlayRenderer {
    fn view_state(&self) -> ViewState;

    /// Programmatic camera write. Emits a notification when the view changed.
    fn apply_view_state(&mut self, view: ViewState);

    fn attach_listener(&mut self);

    fn detach_listener(&mut self);

    /// Oldest pending view-state notification.
    fn take_notification(&mut self) -> Option<ViewState>;

    fn has_pending_notifications(&self) -> bool;
}

/// One drawn overlay frame.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayFrame {
    pub index: u64,
    pub view: ViewState,
    pub instances: Vec<PointInstance>,
}

#[derive(Debug)]
pub struct PointOverlay {
    view: ViewState,
    layer: PointLayer,
    listening: bool,
    changes: EventBus<ViewState>,
    frames: u64,
}

impl PointOverlay {
    pub fn new(style: PointStyle) -> Self {
        Self {
            view: ViewState::default(),
            layer: PointLayer::new(1, style),
            listening: false,
            changes: EventBus::new(),
            frames: 0,
        }
    }

    /// The overlay's own pan/zoom/rotate/tilt controller.
    pub fn interact(&mut self, view: ViewState) {
        let mut view = view.normalized();
        view.pitch = view.pitch.clamp(0.0, MAX_PITCH);
        self.set(view);
    }

    pub fn layer(&self) -> &PointLayer {
        &self.layer
    }

    pub fn layer_mut(&mut self) -> &mut PointLayer {
        &mut self.layer
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    /// Draw the current content with the current camera.
    pub fn render_frame(&mut self) -> OverlayFrame {
        let instances = if self.layer.visible() {
            let origin = lon_lat_to_mercator(self.view.center());
            self.layer.instances(self.view.zoom, origin)
        } else {
            Vec::new()
        };
        let frame = OverlayFrame {
            index: self.frames,
            view: self.view,
            instances,
        };
        self.frames += 1;
        frame
    }

    fn set(&mut self, view: ViewState) {
        let changed = !self.view.same_view(&view, Tolerance::default());
        self.view = view;
        if changed && self.listening {
            self.changes.emit(view);
        }
    }
}

impl OverlayRenderer for PointOverlay {
    fn view_state(&self) -> ViewState {
        self.view
    }

    fn apply_view_state(&mut self, view: ViewState) {
        self.set(view);
    }

    fn attach_listener(&mut self) {
        self.listening = true;
    }

    fn detach_listener(&mut self) {
        self.listening = false;
        self.changes.clear();
    }

    fn take_notification(&mut self) -> Option<ViewState> {
        self.changes.pop().map(|e| e.payload)
    }

    fn has_pending_notifications(&self) -> bool {
        !self.changes.is_empty()
    }
}

impl FeatureSink for PointOverlay {
    fn replace_features(&mut self, batch: FeatureBatch) {
        self.layer.replace_features(batch);
    }
}
