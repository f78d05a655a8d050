//! Command-line flood hazard lookup.
//!
//! Loads a dataset, reports what was loaded, and optionally looks up a
//! single point.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use floodzone::dataset::{DatasetFetcher, DatasetSource};
use floodzone::hazard::{project_point, unproject, HazardIndex, LoadPolicy};
use floodzone::models::HazardFeature;
use floodzone::GeoPoint;

#[derive(Parser, Debug)]
#[command(name = "lookup")]
#[command(about = "Look up the flood hazard at a point")]
struct Args {
    /// Dataset URL or path (.json or .json.gz)
    #[arg(short, long)]
    dataset: String,

    /// Latitude in degrees
    #[arg(long, allow_negative_numbers = true, requires = "lon")]
    lat: Option<f64>,

    /// Longitude in degrees
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    lon: Option<f64>,

    /// Reject the whole dataset if any record is malformed
    #[arg(long)]
    strict: bool,

    /// Print the load report
    #[arg(long)]
    stats: bool,

    /// Download timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Download attempts
    #[arg(long, default_value = "3")]
    max_attempts: u32,

    /// Maximum log level
    #[arg(long, default_value = "info")]
    log_level: Level,
}

/// Result printed for a point lookup
#[derive(Serialize)]
struct LookupOutput {
    latitude: f64,
    longitude: f64,
    x: f64,
    y: f64,
    flood_hazard: Option<String>,
    in_flood_zone: bool,
    /// Matching zone's bounds converted back to degrees
    #[serde(skip_serializing_if = "Option::is_none")]
    zone_bounds: Option<[GeoPoint; 2]>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let source = DatasetSource::parse(&args.dataset);
    let fetcher = DatasetFetcher::new(Duration::from_secs(args.timeout_secs), args.max_attempts)?;
    let raw = fetcher
        .fetch(&source)
        .await
        .with_context(|| format!("Failed to read dataset from {}", source))?;

    let (index, report) = HazardIndex::load(&raw, LoadPolicy::from_strict(args.strict))
        .context("Failed to build hazard index")?;

    if args.stats || args.lat.is_none() {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        let point = GeoPoint::new(lat, lon);
        let planar = project_point(point);
        let feature = index.query_feature(planar);

        info!("Looked up {} against {} zones", point, index.len());

        let output = LookupOutput {
            latitude: lat,
            longitude: lon,
            x: planar.x,
            y: planar.y,
            flood_hazard: feature.map(|f| f.hazard.clone()),
            in_flood_zone: feature.is_some(),
            zone_bounds: feature.map(zone_bounds),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    Ok(())
}

fn zone_bounds(feature: &HazardFeature) -> [GeoPoint; 2] {
    [
        unproject(feature.bounds.min()),
        unproject(feature.bounds.max()),
    ]
}
