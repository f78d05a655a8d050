//! Floodzone - flood hazard lookup by location
//!
//! This library provides the hazard lookup engine and the dataset and
//! geolocation adapters shared by the server and lookup binaries.

pub mod config;
pub mod dataset;
pub mod error;
pub mod geolocate;
pub mod hazard;
pub mod models;

pub use error::{HazardError, Result};
pub use hazard::{HazardIndex, HazardService, LoadPolicy};
pub use models::{GeoPoint, HazardFeature, PlanarPoint};
