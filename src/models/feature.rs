//! Hazard feature types: the raw dataset records and their loaded form.

use geo::BoundingRect;
use geo_types::{Coord, LineString, Rect};
use serde::{Deserialize, Serialize};

use super::PlanarPoint;

/// Bounds record as it appears in the dataset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawBounds {
    pub minx: Option<f64>,
    pub miny: Option<f64>,
    pub maxx: Option<f64>,
    pub maxy: Option<f64>,
}

/// Geometry record as it appears in the dataset.
///
/// Coordinates stay untyped until the geometry type says how to read them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawGeometry {
    #[serde(rename = "type")]
    pub geo_type: Option<String>,
    #[serde(default)]
    pub coordinates: serde_json::Value,
}

/// One record of the flood hazard dataset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFeature {
    #[serde(default)]
    pub bounds: Option<RawBounds>,
    #[serde(default)]
    pub geometry: Option<RawGeometry>,
    #[serde(default)]
    pub hazard: Option<String>,
}

/// Axis-aligned bounding box in planar metres.
///
/// Always satisfies `min <= max` on both axes with finite corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox(Rect<f64>);

impl BoundingBox {
    /// Returns `None` for inverted or non-finite bounds
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Option<Self> {
        let finite = [min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite());
        if !finite || min_x > max_x || min_y > max_y {
            return None;
        }
        Some(Self(Rect::new(
            Coord { x: min_x, y: min_y },
            Coord { x: max_x, y: max_y },
        )))
    }

    pub fn min(&self) -> PlanarPoint {
        self.0.min()
    }

    pub fn max(&self) -> PlanarPoint {
        self.0.max()
    }

    /// Inclusive containment test. NaN coordinates never match.
    #[inline]
    pub fn contains(&self, point: PlanarPoint) -> bool {
        let (min, max) = (self.0.min(), self.0.max());
        min.x <= point.x && point.x <= max.x && min.y <= point.y && point.y <= max.y
    }

    /// Whether `rect` lies entirely within this box
    pub fn covers(&self, rect: &Rect<f64>) -> bool {
        self.contains(rect.min()) && self.contains(rect.max())
    }
}

/// One polygon boundary, implicitly closed.
///
/// A repeated closing vertex is allowed and contributes a zero-length edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Ring(LineString<f64>);

impl Ring {
    /// Returns `None` when fewer than three vertices are given
    pub fn new(coords: Vec<PlanarPoint>) -> Option<Self> {
        if coords.len() < 3 {
            return None;
        }
        Some(Self(LineString::new(coords)))
    }

    pub fn coords(&self) -> &[PlanarPoint] {
        &self.0 .0
    }

    pub fn len(&self) -> usize {
        self.0 .0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0 .0.is_empty()
    }

    /// Extent of the ring's vertices
    pub fn extent(&self) -> Option<Rect<f64>> {
        self.0.bounding_rect()
    }
}

/// A single flood hazard zone
#[derive(Debug, Clone)]
pub struct HazardFeature {
    pub bounds: BoundingBox,
    pub rings: Vec<Ring>,
    pub hazard: String,
}

impl HazardFeature {
    pub fn new(bounds: BoundingBox, rings: Vec<Ring>, hazard: impl Into<String>) -> Self {
        Self {
            bounds,
            rings,
            hazard: hazard.into(),
        }
    }

    /// Whether the declared bounds enclose every ring vertex
    pub fn bounds_cover_rings(&self) -> bool {
        self.rings
            .iter()
            .filter_map(Ring::extent)
            .all(|rect| self.bounds.covers(&rect))
    }
}
