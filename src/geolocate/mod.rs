//! Request geolocation: which IP a request came from, and where that IP is.

mod client_ip;
mod ipapi;

pub use client_ip::client_ip;
pub use ipapi::{IpLocator, Location};
