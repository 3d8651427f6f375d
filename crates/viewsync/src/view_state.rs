use foundation::math::{LonLat, angles_close_degrees, approx_eq, normalize_degrees};

/// Shared camera description.
///
/// Angles are in degrees. `bearing` is clockwise from north, `pitch` is the
/// tilt away from straight down; only the overlay can tilt.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewState {
    pub longitude: f64,
    pub latitude: f64,
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
}

/// Initial camera of every map session.
pub const DEFAULT_VIEW: ViewState = ViewState {
    longitude: 0.0,
    latitude: 0.0,
    zoom: 2.0,
    pitch: 0.0,
    bearing: 0.0,
};

impl Default for ViewState {
    fn default() -> Self {
        DEFAULT_VIEW
    }
}

impl ViewState {
    pub fn new(longitude: f64, latitude: f64, zoom: f64) -> Self {
        Self {
            longitude,
            latitude,
            zoom,
            ..DEFAULT_VIEW
        }
    }

    pub fn with_bearing(mut self, bearing: f64) -> Self {
        self.bearing = bearing;
        self
    }

    pub fn with_pitch(mut self, pitch: f64) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn center(&self) -> LonLat {
        LonLat::new(self.longitude, self.latitude)
    }

    /// Same view with the bearing folded into `(-180, 180]`.
    pub fn normalized(mut self) -> Self {
        self.bearing = normalize_degrees(self.bearing);
        self
    }

    pub fn is_finite(&self) -> bool {
        [
            self.longitude,
            self.latitude,
            self.zoom,
            self.pitch,
            self.bearing,
        ]
        .iter()
        .all(|v| v.is_finite())
    }

    /// Compare the fields the tile map can represent: center, zoom, bearing.
    pub fn same_planar_view(&self, other: &ViewState, tol: Tolerance) -> bool {
        approx_eq(self.longitude, other.longitude, tol.degrees)
            && approx_eq(self.latitude, other.latitude, tol.degrees)
            && approx_eq(self.zoom, other.zoom, tol.zoom)
            && angles_close_degrees(self.bearing, other.bearing, tol.degrees)
    }

    /// Compare every field, including pitch.
    pub fn same_view(&self, other: &ViewState, tol: Tolerance) -> bool {
        self.same_planar_view(other, tol) && approx_eq(self.pitch, other.pitch, tol.degrees)
    }
}

/// Thresholds under which two views count as the same.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Tolerance {
    pub degrees: f64,
    pub zoom: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            degrees: 1e-9,
            zoom: 1e-9,
        }
    }
}
