//! Flood hazard dataset loading.

mod fetcher;

pub use fetcher::{decode_dataset, parse_dataset, DatasetFetcher, DatasetSource};
