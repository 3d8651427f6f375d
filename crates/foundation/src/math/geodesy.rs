/// WGS84 semi-major axis (meters).
pub const WGS84_A: f64 = 6_378_137.0;

/// Geographic coordinates in degrees.
///
/// Longitude first, matching the order used on the wire and by both renderers.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub const ORIGIN: LonLat = LonLat { lon: 0.0, lat: 0.0 };

    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// True when both components are finite and inside the WGS84 domain.
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }

    /// Wrap longitude into [-180, 180). Latitude is left untouched.
    pub fn wrapped(self) -> Self {
        Self::new(wrap_longitude(self.lon), self.lat)
    }
}

/// Wrap a longitude in degrees into [-180, 180).
pub fn wrap_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}
