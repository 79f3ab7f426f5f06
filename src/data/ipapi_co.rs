//! ipapi.co geolocation client
//!
//! Primary provider. Answers with flat JSON; quota and input errors come back
//! either as HTTP 429 or as a `{"error": true, "reason": ...}` body.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::http::{get_body, render_url};
use super::{GeoResolver, IpKind, LookupResult, ProviderFailure};

/// Default lookup URL; `{ip}` is replaced with the address
pub const IPAPI_CO_URL_TEMPLATE: &str = "https://ipapi.co/{ip}/json/";

const PROVIDER_NAME: &str = "ipapi.co";

/// Reason ipapi.co reports when the daily quota is used up
const RATE_LIMITED_REASON: &str = "RateLimited";

/// Shown in place of a field the provider reports as `null`
pub const NOT_AVAILABLE: &str = "N/A";

/// Error body returned with a 200 status
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: bool,
    #[serde(default)]
    reason: Option<String>,
}

/// Successful lookup body
///
/// Text fields may be `null` (anycast and reserved ranges often have no city
/// or org) but must be present.
#[derive(Debug, Deserialize)]
struct IpApiCoResponse {
    ip: String,
    #[serde(deserialize_with = "Option::deserialize")]
    country_name: Option<String>,
    #[serde(deserialize_with = "Option::deserialize")]
    country_code: Option<String>,
    #[serde(deserialize_with = "Option::deserialize")]
    city: Option<String>,
    latitude: f64,
    longitude: f64,
    #[serde(deserialize_with = "Option::deserialize")]
    org: Option<String>,
    #[serde(deserialize_with = "Option::deserialize")]
    asn: Option<String>,
}

fn or_not_available(field: Option<String>) -> String {
    field.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

impl From<IpApiCoResponse> for LookupResult {
    fn from(r: IpApiCoResponse) -> Self {
        LookupResult {
            ip: r.ip,
            country: or_not_available(r.country_name),
            country_code: or_not_available(r.country_code),
            city: or_not_available(r.city),
            lat: r.latitude,
            lon: r.longitude,
            org: or_not_available(r.org),
            asn: or_not_available(r.asn),
        }
    }
}

/// Client for the ipapi.co lookup API
#[derive(Debug, Clone)]
pub struct IpApiCoClient {
    client: Client,
    url_template: String,
}

impl IpApiCoClient {
    /// Creates a client sharing an existing HTTP client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            url_template: IPAPI_CO_URL_TEMPLATE.to_string(),
        }
    }

    /// Overrides the lookup URL template
    pub fn with_url_template(mut self, url_template: impl Into<String>) -> Self {
        self.url_template = url_template.into();
        self
    }

    fn parse_body(body: &str) -> Result<LookupResult, ProviderFailure> {
        if let Ok(err) = serde_json::from_str::<ErrorBody>(body) {
            if err.error {
                let reason = err.reason.unwrap_or_else(|| "unspecified error".to_string());
                if reason == RATE_LIMITED_REASON {
                    return Err(ProviderFailure::RateLimited {
                        provider: PROVIDER_NAME,
                    });
                }
                return Err(ProviderFailure::ParseError {
                    provider: PROVIDER_NAME,
                    message: reason,
                });
            }
        }

        serde_json::from_str::<IpApiCoResponse>(body)
            .map(LookupResult::from)
            .map_err(|e| ProviderFailure::ParseError {
                provider: PROVIDER_NAME,
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl GeoResolver for IpApiCoClient {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn resolve(&self, ip: &str, _kind: IpKind) -> Result<LookupResult, ProviderFailure> {
        let url = render_url(&self.url_template, ip);
        let body = get_body(&self.client, &url, PROVIDER_NAME).await?;
        Self::parse_body(&body)
    }
}
