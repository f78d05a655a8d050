//! WGS84 <-> Web Mercator (EPSG:3857) conversion.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use geo_types::Coord;

use crate::models::{GeoPoint, PlanarPoint};

/// WGS84 equatorial radius in metres, as used by the hazard dataset
pub const EARTH_RADIUS: f64 = 6378137.0;

/// Project a WGS84 latitude/longitude onto the Web Mercator plane.
///
/// Input is not validated. Latitudes of ±90° are not clamped: the north pole
/// lands roughly ten times beyond the Mercator extent and the south pole at
/// `-inf`, so such points fall outside every hazard bounding box.
#[inline]
pub fn project(lat: f64, lon: f64) -> PlanarPoint {
    let x = EARTH_RADIUS * lon.to_radians();
    let y = EARTH_RADIUS * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    Coord { x, y }
}

/// Project a [`GeoPoint`]
#[inline]
pub fn project_point(point: GeoPoint) -> PlanarPoint {
    project(point.lat, point.lon)
}

/// Inverse of [`project`]
pub fn unproject(point: PlanarPoint) -> GeoPoint {
    let lon = (point.x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (point.y / EARTH_RADIUS).exp().atan() - FRAC_PI_2).to_degrees();
    GeoPoint { lat, lon }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_project_is_deterministic() {
        let a = project(37.7749, -122.4194);
        let b = project(37.7749, -122.4194);
        assert_eq!(a.x.to_bits(), b.x.to_bits());
        assert_eq!(a.y.to_bits(), b.y.to_bits());
    }

    #[test]
    fn test_project_origin() {
        // tan(pi/4) rounds just below 1.0, leaving sub-nanometre noise in y
        let p = project(0.0, 0.0);
        assert_eq!(p.x, 0.0);
        assert!(p.y.abs() < 1e-6, "y = {}", p.y);
    }

    #[test]
    fn test_project_quarter_turn_longitude() {
        let p = project(0.0, 90.0);
        assert_eq!(p.x, EARTH_RADIUS * PI / 2.0);
        assert!(p.y.abs() < 1e-6, "y = {}", p.y);
    }

    #[test]
    fn test_project_known_city() {
        // New Orleans
        let p = project(29.9511, -90.0715);
        assert!((p.x - -10_026_713.515).abs() < 0.01, "x = {}", p.x);
        assert!((p.y - 3_497_265.752).abs() < 0.01, "y = {}", p.y);
    }

    #[test]
    fn test_project_poles_are_not_clamped() {
        // tan(pi/2) is finite in floating point, just far off the map
        let north = project(90.0, 0.0);
        assert!(north.y > 1.0e8, "north pole y = {}", north.y);

        let south = project(-90.0, 0.0);
        assert!(south.y.is_infinite() && south.y.is_sign_negative());
    }

    #[test]
    fn test_unproject_inverts_project() {
        let geo = unproject(project(51.5074, -0.1278));
        assert!((geo.lat - 51.5074).abs() < 1e-9);
        assert!((geo.lon - -0.1278).abs() < 1e-9);
    }
}
