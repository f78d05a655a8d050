//! Core data models for the flood hazard lookup.

pub mod feature;
pub mod point;

pub use feature::{BoundingBox, HazardFeature, RawBounds, RawFeature, RawGeometry, Ring};
pub use point::{GeoPoint, PlanarPoint};
