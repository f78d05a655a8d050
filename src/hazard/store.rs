//! Copy-on-write holder for the live hazard index.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use super::HazardIndex;
use crate::error::{HazardError, Result};

/// Shares the current [`HazardIndex`] between concurrent readers.
///
/// Readers take a cheap `Arc` clone and query it without holding any lock.
/// A reload installs a freshly built index; readers that already hold the
/// previous one keep using it until they drop it.
#[derive(Debug, Default)]
pub struct HazardStore {
    current: RwLock<Option<Arc<HazardIndex>>>,
}

impl HazardStore {
    /// Create a store with no index installed
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with an index already installed
    pub fn with_index(index: HazardIndex) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(index))),
        }
    }

    /// The current index, or [`HazardError::IndexUnavailable`]
    pub fn current(&self) -> Result<Arc<HazardIndex>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(HazardError::IndexUnavailable)
    }

    /// Swap in a new index, returning the one it replaces
    pub fn install(&self, index: HazardIndex) -> Option<Arc<HazardIndex>> {
        let features = index.len();
        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::new(index));
        info!("Installed hazard index with {} features", features);
        previous
    }

    pub fn is_loaded(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoundingBox, HazardFeature, Ring};
    use geo_types::Coord;

    fn index(label: &str) -> HazardIndex {
        let ring = Ring::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 10.0, y: 0.0 },
            Coord { x: 10.0, y: 10.0 },
            Coord { x: 0.0, y: 10.0 },
        ])
        .unwrap();
        let bounds = BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
        HazardIndex::from_features(vec![HazardFeature::new(bounds, vec![ring], label)]).unwrap()
    }

    #[test]
    fn test_empty_store_is_unavailable() {
        let store = HazardStore::new();
        assert!(!store.is_loaded());
        assert!(matches!(store.current(), Err(HazardError::IndexUnavailable)));
    }

    #[test]
    fn test_install_swaps_without_disturbing_readers() {
        let store = HazardStore::with_index(index("OLD"));
        let held = store.current().unwrap();

        let previous = store.install(index("NEW"));
        assert!(previous.is_some());

        let point = Coord { x: 5.0, y: 5.0 };
        assert_eq!(held.query(point), Some("OLD"));
        assert_eq!(store.current().unwrap().query(point), Some("NEW"));
    }
}
