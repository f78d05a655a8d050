//! Point types shared by the projector and the hazard index.

use geo_types::Coord;
use serde::{Deserialize, Serialize};

/// Planar point in Web Mercator metres (EPSG:3857)
pub type PlanarPoint = Coord<f64>;

/// Geographic point (lat/lon), WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.lat, self.lon)
    }
}
