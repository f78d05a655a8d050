//! Hazard index: the loaded feature list and its point query.

use chrono::{DateTime, Utc};
use geo_types::Coord;
use hashbrown::HashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::polygon;
use crate::error::{HazardError, Result};
use crate::models::{BoundingBox, HazardFeature, PlanarPoint, RawFeature, Ring};

const POLYGON: &str = "Polygon";

/// What to do with a malformed record during load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadPolicy {
    /// Skip the record and keep loading
    #[default]
    Lenient,
    /// Abort the whole load
    Strict,
}

impl LoadPolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            LoadPolicy::Strict
        } else {
            LoadPolicy::Lenient
        }
    }
}

/// Summary of a dataset load
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    /// Raw records seen
    pub records: usize,
    /// Features that made it into the index
    pub loaded: usize,
    /// Records skipped as malformed
    pub malformed: usize,
    /// Records skipped per unsupported geometry type
    pub unsupported: HashMap<String, usize>,
    /// Loaded features with more than one ring
    pub multi_ring: usize,
    /// Loaded features whose declared bounds do not enclose their rings
    pub loose_bounds: usize,
}

impl LoadReport {
    pub fn skipped(&self) -> usize {
        self.malformed + self.unsupported.values().sum::<usize>()
    }
}

/// Immutable, ordered collection of hazard features
#[derive(Debug)]
pub struct HazardIndex {
    features: Vec<HazardFeature>,
    loaded_at: DateTime<Utc>,
}

impl HazardIndex {
    /// Build an index from raw dataset records.
    ///
    /// Each record is decoded on its own, so a record with a missing or
    /// mistyped field is malformed without affecting its neighbours. Records
    /// whose geometry is not a Polygon are always skipped. Malformed records
    /// are skipped or abort the load according to `policy`. Fails with
    /// [`HazardError::EmptyDataset`] when nothing survives.
    pub fn load(raw: &[Value], policy: LoadPolicy) -> Result<(Self, LoadReport)> {
        info!("Loading {} hazard records...", raw.len());

        // Indexed parallel collect keeps dataset order
        let parsed: Vec<Result<HazardFeature>> = raw
            .par_iter()
            .enumerate()
            .map(|(i, record)| parse_feature(i, record))
            .collect();

        let mut report = LoadReport {
            records: raw.len(),
            ..Default::default()
        };
        let mut features = Vec::with_capacity(parsed.len());

        for result in parsed {
            match result {
                Ok(feature) => {
                    if feature.rings.len() > 1 {
                        report.multi_ring += 1;
                    }
                    if !feature.bounds_cover_rings() {
                        report.loose_bounds += 1;
                    }
                    features.push(feature);
                }
                Err(HazardError::UnsupportedGeometry(geo_type)) => {
                    *report.unsupported.entry(geo_type).or_insert(0) += 1;
                }
                Err(e @ HazardError::MalformedFeature { .. }) => {
                    if policy == LoadPolicy::Strict {
                        return Err(e);
                    }
                    warn!("Skipping record: {}", e);
                    report.malformed += 1;
                }
                Err(e) => return Err(e),
            }
        }
        report.loaded = features.len();

        for (geo_type, count) in &report.unsupported {
            debug!("Skipped {} records with geometry type {}", count, geo_type);
        }
        if report.multi_ring > 0 {
            debug!(
                "{} features have several rings; each ring is matched on its own",
                report.multi_ring
            );
        }

        let index = Self::from_features(features)?;
        info!(
            "Hazard index loaded with {} features ({} skipped)",
            report.loaded,
            report.skipped()
        );
        Ok((index, report))
    }

    /// Build an index from already-validated features
    pub fn from_features(features: Vec<HazardFeature>) -> Result<Self> {
        if features.is_empty() {
            return Err(HazardError::EmptyDataset);
        }
        Ok(Self {
            features,
            loaded_at: Utc::now(),
        })
    }

    /// Hazard label of the first feature containing `point`
    pub fn query(&self, point: PlanarPoint) -> Option<&str> {
        self.query_feature(point).map(|f| f.hazard.as_str())
    }

    /// First feature, in load order, whose box and any ring contain `point`
    pub fn query_feature(&self, point: PlanarPoint) -> Option<&HazardFeature> {
        self.features.iter().find(|feature| {
            feature.bounds.contains(point)
                && feature
                    .rings
                    .iter()
                    .any(|ring| polygon::contains(point, ring))
        })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn features(&self) -> &[HazardFeature] {
        &self.features
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

/// Interpret one raw record
fn parse_feature(index: usize, record: &Value) -> Result<HazardFeature> {
    let raw = RawFeature::deserialize(record)
        .map_err(|e| HazardError::malformed(index, e.to_string()))?;

    let geometry = raw
        .geometry
        .as_ref()
        .ok_or_else(|| HazardError::malformed(index, "missing geometry"))?;

    let geo_type = geometry
        .geo_type
        .as_deref()
        .ok_or_else(|| HazardError::malformed(index, "geometry has no type"))?;
    if geo_type != POLYGON {
        return Err(HazardError::UnsupportedGeometry(geo_type.to_string()));
    }

    let bounds = raw
        .bounds
        .as_ref()
        .ok_or_else(|| HazardError::malformed(index, "missing bounds"))?;
    let bounds = match (bounds.minx, bounds.miny, bounds.maxx, bounds.maxy) {
        (Some(min_x), Some(min_y), Some(max_x), Some(max_y)) => {
            BoundingBox::new(min_x, min_y, max_x, max_y)
                .ok_or_else(|| HazardError::malformed(index, "inverted or non-finite bounds"))?
        }
        _ => return Err(HazardError::malformed(index, "incomplete bounds")),
    };

    let hazard = raw
        .hazard
        .ok_or_else(|| HazardError::malformed(index, "missing hazard"))?;

    let rings = parse_rings(&geometry.coordinates).map_err(|r| HazardError::malformed(index, r))?;

    Ok(HazardFeature::new(bounds, rings, hazard))
}

/// Read Polygon coordinates: a list of rings, each a list of `[x, y, ..]`
fn parse_rings(coordinates: &Value) -> std::result::Result<Vec<Ring>, String> {
    let rings = coordinates
        .as_array()
        .ok_or("coordinates are not an array of rings")?;
    if rings.is_empty() {
        return Err("polygon has no rings".to_string());
    }

    rings
        .iter()
        .enumerate()
        .map(|(r, ring)| {
            let positions = ring
                .as_array()
                .ok_or_else(|| format!("ring {} is not an array", r))?;
            let coords = positions
                .iter()
                .map(parse_position)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| format!("ring {} has an invalid position", r))?;
            Ring::new(coords).ok_or_else(|| format!("ring {} has fewer than 3 vertices", r))
        })
        .collect()
}

fn parse_position(position: &Value) -> Option<PlanarPoint> {
    let pair = position.as_array()?;
    let x = pair.first()?.as_f64()?;
    let y = pair.get(1)?.as_f64()?;
    Some(Coord { x, y })
}
