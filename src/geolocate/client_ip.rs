//! Client IP resolution from request parameters and proxy headers.

use std::net::IpAddr;

use axum::http::HeaderMap;
use tracing::debug;

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";

/// Pick the IP to geolocate for a request.
///
/// Precedence: explicit `ip` query parameter, first entry of
/// `X-Forwarded-For`, `X-Real-IP`, then `default`. Values that do not parse
/// as an IP address are passed over.
pub fn client_ip(query_ip: Option<&str>, headers: &HeaderMap, default: IpAddr) -> IpAddr {
    let forwarded = header_value(headers, FORWARDED_FOR)
        .and_then(|v| v.split(',').next())
        .map(str::trim);
    let real_ip = header_value(headers, REAL_IP).map(str::trim);

    [query_ip.map(str::trim), forwarded, real_ip]
        .into_iter()
        .flatten()
        .filter(|candidate| !candidate.is_empty())
        .find_map(|candidate| match candidate.parse::<IpAddr>() {
            Ok(ip) => Some(ip),
            Err(_) => {
                debug!("Ignoring unparseable client IP {:?}", candidate);
                None
            }
        })
        .unwrap_or(default)
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
