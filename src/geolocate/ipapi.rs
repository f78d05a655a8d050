//! IP geolocation against an ipapi.co compatible endpoint.

use std::net::IpAddr;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::{HazardError, Result};
use crate::models::GeoPoint;

const UNKNOWN: &str = "Unknown";

/// Where an IP address resolved to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub point: GeoPoint,
    pub city: String,
    pub region: String,
    pub country: String,
}

#[derive(Debug, Default, Deserialize)]
struct IpapiResponse {
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
    region: Option<String>,
    country_name: Option<String>,
}

impl IpapiResponse {
    fn into_location(self) -> Option<Location> {
        let point = GeoPoint::new(self.latitude?, self.longitude?);
        Some(Location {
            point,
            city: self.city.unwrap_or_else(|| UNKNOWN.to_string()),
            region: self.region.unwrap_or_else(|| UNKNOWN.to_string()),
            country: self.country_name.unwrap_or_else(|| UNKNOWN.to_string()),
        })
    }
}

/// Resolves IP addresses to geographic locations
pub struct IpLocator {
    client: Client,
    endpoint: Url,
}

impl IpLocator {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| HazardError::config(format!("invalid geolocation endpoint: {}", e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(HazardError::config(format!(
                "geolocation endpoint {} cannot take a path",
                endpoint
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    /// `{endpoint}/{ip}/json/`
    pub fn lookup_url(&self, ip: IpAddr) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&ip.to_string()).push("json").push("");
        }
        url
    }

    /// Locate `ip`. Provider or transport failures are logged and yield `None`.
    pub async fn locate(&self, ip: IpAddr) -> Option<Location> {
        let url = self.lookup_url(ip);

        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Error getting IP location for {}: {}", ip, e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(
                "IP location lookup for {} failed with status {}",
                ip,
                response.status()
            );
            return None;
        }

        let data: IpapiResponse = match response.json().await {
            Ok(d) => d,
            Err(e) => {
                warn!("Failed to parse IP location response: {}", e);
                return None;
            }
        };

        let location = data.into_location();
        debug!("Located {} at {:?}", ip, location.as_ref().map(|l| l.point));
        location
    }
}
