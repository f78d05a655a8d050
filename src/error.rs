//! Error types for the hazard lookup engine.

use thiserror::Error;

/// Result type alias using [`HazardError`]
pub type Result<T> = std::result::Result<T, HazardError>;

/// Errors raised while loading or querying hazard data.
///
/// Only `EmptyDataset` and `IndexUnavailable` are meant to reach a request
/// handler; the feature-level variants are recovered during load unless the
/// strict policy is in effect.
#[derive(Error, Debug)]
pub enum HazardError {
    /// A raw record lacks bounds, geometry or hazard, or has an unusable ring
    #[error("Malformed feature #{index}: {reason}")]
    MalformedFeature { index: usize, reason: String },

    /// Geometry type other than "Polygon"
    #[error("Unsupported geometry type: {0}")]
    UnsupportedGeometry(String),

    /// The dataset was empty or nothing in it could be loaded
    #[error("Dataset contains no usable hazard features")]
    EmptyDataset,

    /// No index has been installed yet
    #[error("Hazard index unavailable")]
    IndexUnavailable,

    /// The raw dataset could not be interpreted
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl HazardError {
    /// Create a malformed feature error
    pub fn malformed(index: usize, reason: impl Into<String>) -> Self {
        HazardError::MalformedFeature {
            index,
            reason: reason.into(),
        }
    }

    /// Create a dataset error
    pub fn dataset(msg: impl Into<String>) -> Self {
        HazardError::Dataset(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        HazardError::Config(msg.into())
    }
}
