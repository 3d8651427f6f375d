//! Spherical Web Mercator (EPSG:3857).
//!
//! Both the tile renderer and the point overlay agree on this projection.
//! `lon_lat_to_mercator` and `mercator_to_lon_lat` are exact inverses inside
//! the Mercator latitude limit, so bridging a camera center back and forth does
//! not accumulate drift.

use std::f64::consts::PI;

use super::{LonLat, WGS84_A};

/// Sphere radius used by EPSG:3857 (the WGS84 semi-major axis).
pub const MERCATOR_RADIUS: f64 = WGS84_A;

/// Half the projected world width in meters (≈ 20 037 508.34).
pub const MERCATOR_HALF_EXTENT: f64 = PI * MERCATOR_RADIUS;

/// Latitude at which the projected world becomes square.
pub const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// Pixel size of one map tile.
pub const TILE_SIZE_PX: f64 = 256.0;

/// Meters per pixel at zoom 0.
pub const ZOOM0_RESOLUTION: f64 = 2.0 * MERCATOR_HALF_EXTENT / TILE_SIZE_PX;

/// Projected coordinates in meters.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Mercator {
    pub x: f64,
    pub y: f64,
}

impl Mercator {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

pub fn lon_lat_to_mercator(p: LonLat) -> Mercator {
    let lat = p.lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT);
    let x = MERCATOR_RADIUS * p.lon.to_radians();
    let y = MERCATOR_RADIUS * lat.to_radians().tan().asinh();
    Mercator::new(x, y)
}

pub fn mercator_to_lon_lat(m: Mercator) -> LonLat {
    let lon = (m.x / MERCATOR_RADIUS).to_degrees();
    let lat = (m.y / MERCATOR_RADIUS).sinh().atan().to_degrees();
    LonLat::new(lon, lat)
}

/// Meters per pixel for a (fractional) zoom level on the 256px tile grid.
pub fn resolution_for_zoom(zoom: f64) -> f64 {
    ZOOM0_RESOLUTION / zoom.exp2()
}

/// Inverse of [`resolution_for_zoom`].
pub fn zoom_for_resolution(resolution: f64) -> f64 {
    (ZOOM0_RESOLUTION / resolution).log2()
}

/// Tile coordinate in ZXY scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }
}

/// Column of the tile containing `lon` at zoom `z`.
pub fn lon_to_tile_x(lon: f64, z: u8) -> u32 {
    let n = 1u32 << z;
    let x = ((lon + 180.0) / 360.0 * n as f64).floor() as i64;
    x.clamp(0, n as i64 - 1) as u32
}

/// Row of the tile containing `lat` at zoom `z` (rows grow southwards).
pub fn lat_to_tile_y(lat: f64, z: u8) -> u32 {
    let n = 1u32 << z;
    let lat_rad = lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT).to_radians();
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n as f64).floor() as i64;
    y.clamp(0, n as i64 - 1) as u32
}

/// All tiles at zoom `z` intersecting the projected rectangle `[min, max]`.
pub fn tiles_covering(min: Mercator, max: Mercator, z: u8) -> Vec<TileCoord> {
    let sw = mercator_to_lon_lat(min);
    let ne = mercator_to_lon_lat(max);
    let x_min = lon_to_tile_x(sw.lon, z);
    let x_max = lon_to_tile_x(ne.lon, z);
    let y_min = lat_to_tile_y(ne.lat, z);
    let y_max = lat_to_tile_y(sw.lat, z);

    let mut out = Vec::with_capacity(((x_max - x_min + 1) * (y_max - y_min + 1)) as usize);
    for x in x_min..=x_max {
        for y in y_min..=y_max {
            out.push(TileCoord::new(z, x, y));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn origin_projects_to_origin() {
        let m = lon_lat_to_mercator(LonLat::ORIGIN);
        assert_close(m.x, 0.0, 1e-9);
        assert_close(m.y, 0.0, 1e-9);
    }

    #[test]
    fn antimeridian_projects_to_half_extent() {
        let m = lon_lat_to_mercator(LonLat::new(180.0, 0.0));
        assert_close(m.x, MERCATOR_HALF_EXTENT, 1e-6);
        let m = lon_lat_to_mercator(LonLat::new(0.0, MERCATOR_MAX_LAT));
        assert_close(m.y, MERCATOR_HALF_EXTENT, 1e-3);
    }

    #[test]
    fn round_trip_over_the_valid_domain() {
        let mut lon = -180.0;
        while lon <= 180.0 {
            let mut lat = -85.0;
            while lat <= 85.0 {
                let p = LonLat::new(lon, lat);
                let rt = mercator_to_lon_lat(lon_lat_to_mercator(p));
                assert_close(rt.lon, p.lon, 1e-6);
                assert_close(rt.lat, p.lat, 1e-6);
                lat += 2.5;
            }
            lon += 7.5;
        }
    }

    #[test]
    fn repeated_round_trips_do_not_drift() {
        let start = LonLat::new(-73.985_428, 40.748_817);
        let mut p = start;
        for _ in 0..10_000 {
            p = mercator_to_lon_lat(lon_lat_to_mercator(p));
        }
        assert_close(p.lon, start.lon, 1e-9);
        assert_close(p.lat, start.lat, 1e-9);
    }

    #[test]
    fn latitude_is_clamped_to_the_square_world() {
        let m = lon_lat_to_mercator(LonLat::new(0.0, 89.9));
        let top = lon_lat_to_mercator(LonLat::new(0.0, MERCATOR_MAX_LAT));
        assert_close(m.y, top.y, 1e-9);
    }

    #[test]
    fn zoom_resolution_are_inverse() {
        assert_close(resolution_for_zoom(0.0), 156_543.033_928_040_97, 1e-6);
        for z in [0.0, 1.0, 2.0, 2.5, 7.25, 18.0, 22.0] {
            assert_close(zoom_for_resolution(resolution_for_zoom(z)), z, 1e-12);
        }
    }

    #[test]
    fn whole_world_is_one_tile_at_zoom_zero() {
        let min = Mercator::new(-MERCATOR_HALF_EXTENT, -MERCATOR_HALF_EXTENT);
        let max = Mercator::new(MERCATOR_HALF_EXTENT, MERCATOR_HALF_EXTENT);
        assert_eq!(tiles_covering(min, max, 0), vec![TileCoord::new(0, 0, 0)]);
        assert_eq!(tiles_covering(min, max, 2).len(), 16);
    }

    #[test]
    fn tile_indices_grow_east_and_south() {
        assert_eq!(lon_to_tile_x(-180.0, 1), 0);
        assert_eq!(lon_to_tile_x(10.0, 1), 1);
        assert_eq!(lat_to_tile_y(45.0, 1), 0);
        assert_eq!(lat_to_tile_y(-45.0, 1), 1);
    }
}
