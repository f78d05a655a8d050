//! Hazard service: geographic point in, hazard label out.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{project_point, HazardIndex, HazardStore, LoadPolicy, LoadReport};
use crate::error::Result;
use crate::models::{GeoPoint, PlanarPoint};

/// Outcome of a hazard lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HazardLookup {
    pub point: GeoPoint,
    /// Query point in Web Mercator
    pub x: f64,
    pub y: f64,
    /// Label of the first matching zone
    pub hazard: Option<String>,
}

impl HazardLookup {
    pub fn in_flood_zone(&self) -> bool {
        self.hazard.is_some()
    }
}

/// Flood hazard lookup service
#[derive(Debug, Default)]
pub struct HazardService {
    store: HazardStore,
}

impl HazardService {
    /// Create a new hazard service around a store
    pub fn new(store: HazardStore) -> Self {
        Self { store }
    }

    /// Look up the hazard for a geographic point.
    ///
    /// `Ok` with `hazard: None` means no zone matched; an error means no
    /// index is available to answer at all.
    pub fn lookup(&self, point: GeoPoint) -> Result<HazardLookup> {
        let planar = project_point(point);
        let hazard = self.lookup_planar(planar)?;

        debug!(
            "Hazard lookup at {} -> ({}, {}): {:?}",
            point, planar.x, planar.y, hazard
        );

        Ok(HazardLookup {
            point,
            x: planar.x,
            y: planar.y,
            hazard,
        })
    }

    /// Look up the hazard for an already projected point
    pub fn lookup_planar(&self, point: PlanarPoint) -> Result<Option<String>> {
        let index = self.store.current()?;
        Ok(index.query(point).map(str::to_string))
    }

    /// Build a new index from `raw` and swap it in.
    ///
    /// On failure the previously installed index stays live.
    pub fn reload(&self, raw: &[Value], policy: LoadPolicy) -> Result<LoadReport> {
        let (index, report) = HazardIndex::load(raw, policy)?;
        self.store.install(index);
        Ok(report)
    }

    /// Get the underlying store (for health/stats)
    pub fn store(&self) -> &HazardStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HazardError;
    use serde_json::json;

    fn records(hazard: &str) -> Vec<Value> {
        vec![json!({
            "bounds": { "minx": -10, "miny": -10, "maxx": 10, "maxy": 10 },
            "geometry": { "type": "Polygon", "coordinates": [[[-5, -5], [5, -5], [5, 5], [-5, 5]]] },
            "hazard": hazard
        })]
    }

    #[test]
    fn test_unavailable_is_distinct_from_no_match() {
        let service = HazardService::default();

        let err = service.reload(&[], LoadPolicy::Lenient).unwrap_err();
        assert!(matches!(err, HazardError::EmptyDataset));
        assert!(matches!(
            service.lookup(GeoPoint::new(0.0, 0.0)),
            Err(HazardError::IndexUnavailable)
        ));

        service.reload(&records("HIGH"), LoadPolicy::Lenient).unwrap();
        let miss = service.lookup(GeoPoint::new(45.0, 45.0)).unwrap();
        assert_eq!(miss.hazard, None);
        assert!(!miss.in_flood_zone());
    }

    #[test]
    fn test_lookup_projects_before_querying() {
        let service = HazardService::default();
        service.reload(&records("HIGH"), LoadPolicy::Lenient).unwrap();

        let hit = service.lookup(GeoPoint::new(0.0, 0.0)).unwrap();
        assert_eq!(hit.hazard.as_deref(), Some("HIGH"));
        assert!(hit.in_flood_zone());
        assert_eq!(hit.x, 0.0);
    }

    #[test]
    fn test_failed_reload_keeps_previous_index() {
        let service = HazardService::default();
        service.reload(&records("HIGH"), LoadPolicy::Lenient).unwrap();

        assert!(service.reload(&[], LoadPolicy::Lenient).is_err());
        assert_eq!(
            service.lookup_planar(PlanarPoint { x: 0.0, y: 0.0 }).unwrap(),
            Some("HIGH".to_string())
        );

        service.reload(&records("LOW"), LoadPolicy::Lenient).unwrap();
        assert_eq!(
            service.lookup_planar(PlanarPoint { x: 0.0, y: 0.0 }).unwrap(),
            Some("LOW".to_string())
        );
    }
}
