//! Core data models for ipscope
//!
//! This module contains the lookup result shared by every provider, the
//! provider failure taxonomy, and the `GeoResolver` trait the fallback
//! coordinator drives. Concrete provider clients live in the submodules.

mod http;
pub mod ip_api;
pub mod ipapi_co;
pub mod own_ip;

pub use ip_api::IpApiClient;
pub use ipapi_co::IpApiCoClient;
pub use own_ip::{OwnIpClient, OwnIpDetector, OwnIpError};

use std::fmt;
use std::net::IpAddr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// IP protocol family requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpKind {
    Ipv4,
    Ipv6,
}

impl IpKind {
    /// Lowercase identifier used in cache keys and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            IpKind::Ipv4 => "ipv4",
            IpKind::Ipv6 => "ipv6",
        }
    }

    /// Returns true if `ip` belongs to this family
    pub fn matches(&self, ip: &IpAddr) -> bool {
        matches!(
            (self, ip),
            (IpKind::Ipv4, IpAddr::V4(_)) | (IpKind::Ipv6, IpAddr::V6(_))
        )
    }
}

impl fmt::Display for IpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpKind::Ipv4 => f.write_str("IPv4"),
            IpKind::Ipv6 => f.write_str("IPv6"),
        }
    }
}

/// Geolocation and ISP details for a single address
///
/// Field values are passed through from the provider untouched. Serialized
/// names follow the common `ip-api` layout so cached entries stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResult {
    /// Address the provider answered for
    pub ip: String,
    /// Country name
    pub country: String,
    /// ISO 3166-1 alpha-2 country code
    pub country_code: String,
    /// City name
    pub city: String,
    /// Latitude coordinate
    pub lat: f64,
    /// Longitude coordinate
    pub lon: f64,
    /// Organisation or ISP operating the address
    pub org: String,
    /// Autonomous system, e.g. `AS15169`
    #[serde(rename = "as")]
    pub asn: String,
}

/// Ways a single provider call can fail
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderFailure {
    /// The provider answered HTTP 429 (or its equivalent)
    #[error("{provider} rate limited the request")]
    RateLimited { provider: &'static str },

    /// Connection, timeout, or unexpected HTTP status
    #[error("{provider} request failed: {message}")]
    TransportError {
        provider: &'static str,
        message: String,
    },

    /// The response did not match the provider's schema
    #[error("{provider} returned an unusable response: {message}")]
    ParseError {
        provider: &'static str,
        message: String,
    },
}

impl ProviderFailure {
    /// Name of the provider that produced this failure
    pub fn provider(&self) -> &'static str {
        match self {
            ProviderFailure::RateLimited { provider }
            | ProviderFailure::TransportError { provider, .. }
            | ProviderFailure::ParseError { provider, .. } => provider,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderFailure::RateLimited { .. })
    }
}

/// A geolocation provider that can resolve one address per call
#[async_trait]
pub trait GeoResolver: Send + Sync {
    /// Short provider name used in logs and error messages
    fn name(&self) -> &'static str;

    /// Look up geolocation and ISP data for `ip`
    async fn resolve(&self, ip: &str, kind: IpKind) -> Result<LookupResult, ProviderFailure>;
}
