//! ip-api.com geolocation client
//!
//! Secondary provider, used when the primary is rate limited. Every response
//! carries a `status` field; `"fail"` bodies explain themselves in `message`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::http::{get_body, render_url};
use super::{GeoResolver, IpKind, LookupResult, ProviderFailure};

/// Default lookup URL; `{ip}` is replaced with the address
pub const IP_API_URL_TEMPLATE: &str = "http://ip-api.com/json/{ip}";

const PROVIDER_NAME: &str = "ip-api.com";

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiResponse {
    query: String,
    country: String,
    country_code: String,
    city: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    isp: String,
    #[serde(default)]
    org: String,
    #[serde(rename = "as")]
    asn: String,
}

/// Client for the ip-api.com JSON endpoint
#[derive(Debug, Clone)]
pub struct IpApiClient {
    client: Client,
    url_template: String,
}

impl IpApiClient {
    /// Creates a client sharing an existing HTTP client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            url_template: IP_API_URL_TEMPLATE.to_string(),
        }
    }

    /// Overrides the lookup URL template
    pub fn with_url_template(mut self, url_template: impl Into<String>) -> Self {
        self.url_template = url_template.into();
        self
    }

    fn parse_body(body: &str) -> Result<LookupResult, ProviderFailure> {
        let parse_error = |message: String| ProviderFailure::ParseError {
            provider: PROVIDER_NAME,
            message,
        };

        let status: StatusBody =
            serde_json::from_str(body).map_err(|e| parse_error(e.to_string()))?;
        if status.status != "success" {
            return Err(parse_error(
                status
                    .message
                    .unwrap_or_else(|| format!("status '{}'", status.status)),
            ));
        }

        let response: IpApiResponse =
            serde_json::from_str(body).map_err(|e| parse_error(e.to_string()))?;

        // org is sometimes blank for consumer ranges; the ISP name is the next best thing
        let org = if response.org.trim().is_empty() {
            response.isp
        } else {
            response.org
        };
        if org.trim().is_empty() {
            return Err(parse_error("missing field `org`".to_string()));
        }

        Ok(LookupResult {
            ip: response.query,
            country: response.country,
            country_code: response.country_code,
            city: response.city,
            lat: response.lat,
            lon: response.lon,
            org,
            asn: response.asn,
        })
    }
}

#[async_trait]
impl GeoResolver for IpApiClient {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn resolve(&self, ip: &str, _kind: IpKind) -> Result<LookupResult, ProviderFailure> {
        let url = render_url(&self.url_template, ip);
        let body = get_body(&self.client, &url, PROVIDER_NAME).await?;
        Self::parse_body(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GOOGLE_BODY: &str = r#"{
        "status": "success",
        "country": "United States",
        "countryCode": "US",
        "region": "VA",
        "regionName": "Virginia",
        "city": "Ashburn",
        "zip": "20149",
        "lat": 39.03,
        "lon": -77.5,
        "timezone": "America/New_York",
        "isp": "Google LLC",
        "org": "Google Public DNS",
        "as": "AS15169 Google LLC",
        "query": "8.8.8.8"
    }"#;

    fn client_for(server: &MockServer) -> IpApiClient {
        IpApiClient::with_client(Client::new())
            .with_url_template(format!("{}/json/{{ip}}", server.uri()))
    }

    #[test]
    fn test_parse_valid_body() {
        let result = IpApiClient::parse_body(GOOGLE_BODY).unwrap();

        assert_eq!(result.ip, "8.8.8.8");
        assert_eq!(result.country, "United States");
        assert_eq!(result.country_code, "US");
        assert_eq!(result.city, "Ashburn");
        assert!((result.lat - 39.03).abs() < 0.0001);
        assert!((result.lon - (-77.5)).abs() < 0.0001);
        assert_eq!(result.org, "Google Public DNS");
        assert_eq!(result.asn, "AS15169 Google LLC");
    }

    #[test]
    fn test_parse_blank_org_falls_back_to_isp() {
        let body = r#"{
            "status": "success", "country": "Canada", "countryCode": "CA",
            "city": "Vancouver", "lat": 49.28, "lon": -123.12,
            "isp": "Shaw Communications", "org": "", "as": "AS6327 Shaw",
            "query": "24.80.0.1"
        }"#;

        let result = IpApiClient::parse_body(body).unwrap();
        assert_eq!(result.org, "Shaw Communications");
    }

    #[test]
    fn test_parse_fail_status_carries_message() {
        let body = r#"{"status": "fail", "message": "private range", "query": "10.0.0.1"}"#;

        let err = IpApiClient::parse_body(body).unwrap_err();
        assert_eq!(
            err,
            ProviderFailure::ParseError {
                provider: "ip-api.com",
                message: "private range".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_missing_required_field() {
        let body = r#"{"status": "success", "country": "United States", "query": "8.8.8.8"}"#;

        let err = IpApiClient::parse_body(body).unwrap_err();
        assert!(matches!(err, ProviderFailure::ParseError { .. }));
    }

    #[tokio::test]
    async fn test_resolve_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/8.8.8.8"))
            .respond_with(ResponseTemplate::new(200).set_body_string(GOOGLE_BODY))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server)
            .resolve("8.8.8.8", IpKind::Ipv4)
            .await
            .unwrap();

        assert_eq!(result.city, "Ashburn");
    }

    #[tokio::test]
    async fn test_resolve_http_429_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .resolve("8.8.8.8", IpKind::Ipv4)
            .await
            .unwrap_err();

        assert_eq!(err, ProviderFailure::RateLimited { provider: "ip-api.com" });
    }
}
