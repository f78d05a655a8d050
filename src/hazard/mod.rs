//! Flood hazard lookup engine.
//!
//! Projects WGS84 points into Web Mercator and finds the first hazard
//! polygon containing them, using bounding-box pre-filtering and even-odd
//! ray casting.

mod index;
pub mod polygon;
pub mod projection;
mod service;
mod store;

pub use index::{HazardIndex, LoadPolicy, LoadReport};
pub use projection::{project, project_point, unproject, EARTH_RADIUS};
pub use service::{HazardLookup, HazardService};
pub use store::HazardStore;
