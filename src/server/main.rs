//! Flood hazard lookup server.
//!
//! Resolves the caller's IP to a location and reports the flood hazard zone
//! it falls in, if any.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use floodzone::config::Config;
use floodzone::dataset::{DatasetFetcher, DatasetSource};
use floodzone::geolocate::{client_ip, IpLocator};
use floodzone::hazard::{HazardLookup, HazardService, LoadPolicy, LoadReport};
use floodzone::{GeoPoint, HazardError};

/// Label reported when a point lies in no hazard zone
const NO_HAZARD: &str = "NONE";

/// Retry interval while no dataset has been loaded
const LOAD_RETRY_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Flood hazard lookup server")]
struct Args {
    /// Optional TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (overrides config)
    #[arg(short, long)]
    listen: Option<String>,

    /// Dataset URL or path (overrides config)
    #[arg(long)]
    dataset: Option<String>,

    /// Reject the whole dataset if any record is malformed
    #[arg(long)]
    strict: bool,

    /// Maximum log level
    #[arg(long, default_value = "debug")]
    log_level: Level,
}

/// Application state shared across handlers
struct AppState {
    service: HazardService,
    locator: IpLocator,
    fetcher: DatasetFetcher,
    source: DatasetSource,
    policy: LoadPolicy,
    default_ip: IpAddr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshMode {
    /// Keep reloading on every tick
    Always,
    /// Stop once an index is installed
    UntilLoaded,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Floodzone Server");

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    if let Some(listen) = &args.listen {
        config.server.listen = listen.clone();
    }
    if let Some(dataset) = &args.dataset {
        config.dataset.path = None;
        config.dataset.url = Some(dataset.clone());
    }
    if args.strict {
        config.dataset.strict = true;
    }

    let source = config
        .dataset
        .source()
        .context("No dataset configured: set dataset.url or dataset.path, or pass --dataset")?;
    let default_ip: IpAddr = config
        .server
        .default_ip
        .parse()
        .context("Invalid server.default_ip")?;

    let state = Arc::new(AppState {
        service: HazardService::default(),
        locator: IpLocator::new(&config.geolocation.endpoint, config.geolocation.timeout())?,
        fetcher: DatasetFetcher::new(config.dataset.timeout(), config.dataset.max_attempts)?,
        source,
        policy: config.dataset.policy(),
        default_ip,
    });

    // A failed initial load leaves the server up and reporting 503s
    let loaded = match load_dataset(&state).await {
        Ok(_) => true,
        Err(e) => {
            error!("Error loading flood data: {:#}", e);
            false
        }
    };

    match config.dataset.refresh_interval() {
        Some(every) => spawn_refresh(Arc::clone(&state), every, RefreshMode::Always),
        None if !loaded => spawn_refresh(
            Arc::clone(&state),
            LOAD_RETRY_INTERVAL,
            RefreshMode::UntilLoaded,
        ),
        None => {}
    }

    let app = router(state);

    info!("Starting server on {}", config.server.listen);

    let listener = tokio::net::TcpListener::bind(&config.server.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/flood", get(flood_handler))
        .route("/v1/flood/point", get(point_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Fetch the dataset and swap a freshly built index in
async fn load_dataset(state: &Arc<AppState>) -> Result<LoadReport> {
    let raw = state.fetcher.fetch(&state.source).await?;

    let worker = Arc::clone(state);
    let report =
        tokio::task::spawn_blocking(move || worker.service.reload(&raw, worker.policy)).await??;

    info!(
        "Flood data ready: {} zones loaded, {} records skipped",
        report.loaded,
        report.skipped()
    );
    Ok(report)
}

fn spawn_refresh(state: Arc<AppState>, every: Duration, mode: RefreshMode) {
    info!("Reloading flood data every {:?} ({:?})", every, mode);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick fires immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if mode == RefreshMode::UntilLoaded && state.service.store().is_loaded() {
                break;
            }
            if let Err(e) = load_dataset(&state).await {
                warn!("Flood data reload failed, keeping current index: {:#}", e);
            }
        }
    });
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let index = state.service.store().current().ok();

    Json(HealthResponse {
        status: if index.is_some() { "ok" } else { "degraded" },
        features: index.as_ref().map_or(0, |i| i.len()),
        loaded_at: index.as_ref().map(|i| i.loaded_at()),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    features: usize,
    loaded_at: Option<DateTime<Utc>>,
}

/// Flood hazard for the requesting IP
async fn flood_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<FloodQueryParams>, QueryRejection>,
    headers: HeaderMap,
) -> Result<Json<FloodResponse>, ApiError> {
    let Query(params) = params.map_err(query_error)?;
    let ip = client_ip(params.ip.as_deref(), &headers, state.default_ip);

    let location = state.locator.locate(ip).await.ok_or_else(|| {
        api_error(
            StatusCode::BAD_REQUEST,
            format!("Could not determine location for IP: {}", ip),
        )
    })?;

    let lookup = state.service.lookup(location.point).map_err(hazard_error)?;

    Ok(Json(FloodResponse {
        ip: ip.to_string(),
        location: LocationBody {
            latitude: location.point.lat,
            longitude: location.point.lon,
            city: location.city,
            region: location.region,
            country: location.country,
        },
        in_flood_zone: lookup.in_flood_zone(),
        flood_hazard: hazard_label(&lookup),
    }))
}

/// Flood hazard for an explicit point
async fn point_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<PointQueryParams>, QueryRejection>,
) -> Result<Json<PointResponse>, ApiError> {
    let Query(params) = params.map_err(query_error)?;
    let lookup = state
        .service
        .lookup(GeoPoint::new(params.lat, params.lon))
        .map_err(hazard_error)?;

    Ok(Json(PointResponse {
        latitude: lookup.point.lat,
        longitude: lookup.point.lon,
        x: lookup.x,
        y: lookup.y,
        in_flood_zone: lookup.in_flood_zone(),
        flood_hazard: hazard_label(&lookup),
    }))
}

#[derive(Deserialize)]
struct FloodQueryParams {
    /// IP to look up instead of the caller's
    ip: Option<String>,
}

#[derive(Deserialize)]
struct PointQueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Serialize)]
struct FloodResponse {
    ip: String,
    location: LocationBody,
    flood_hazard: String,
    in_flood_zone: bool,
}

#[derive(Serialize)]
struct LocationBody {
    latitude: f64,
    longitude: f64,
    city: String,
    region: String,
    country: String,
}

#[derive(Serialize)]
struct PointResponse {
    latitude: f64,
    longitude: f64,
    x: f64,
    y: f64,
    flood_hazard: String,
    in_flood_zone: bool,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: String) -> ApiError {
    (status, Json(ErrorResponse { error: message }))
}

fn query_error(rejection: QueryRejection) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, rejection.body_text())
}

fn hazard_error(e: HazardError) -> ApiError {
    match e {
        HazardError::IndexUnavailable => {
            error!("Hazard lookup with no index loaded");
            api_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "Failed to load flood hazard data".to_string(),
            )
        }
        other => {
            error!("Hazard lookup failed: {}", other);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal server error: {}", other),
            )
        }
    }
}

fn hazard_label(lookup: &HazardLookup) -> String {
    lookup
        .hazard
        .clone()
        .unwrap_or_else(|| NO_HAZARD.to_string())
}
