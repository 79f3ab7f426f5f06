//! Public address detection
//!
//! Asks "what is my IP" services for the caller's own address. Endpoints are
//! tried in order and the first usable answer wins.

use std::net::IpAddr;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use super::IpKind;
use crate::config::OwnIpEndpoints;

/// Errors that can occur when detecting the caller's address
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OwnIpError {
    /// Every IPv6 endpoint failed
    #[error("unable to retrieve an IPv6 address: your environment does not appear to support IPv6 or DNS resolution failed ({last_error})")]
    Ipv6Unavailable { last_error: String },

    /// Every endpoint for the family failed
    #[error("failed to retrieve {kind} address: {last_error}")]
    Failed { kind: IpKind, last_error: String },

    /// No endpoints configured for the family
    #[error("no endpoints configured for {0} detection")]
    NoEndpoints(IpKind),
}

/// Something that can tell the caller their public address
#[async_trait]
pub trait OwnIpDetector: Send + Sync {
    async fn detect(&self, kind: IpKind) -> Result<IpAddr, OwnIpError>;
}

/// HTTP-backed detector using plain-text "what is my IP" endpoints
#[derive(Debug, Clone)]
pub struct OwnIpClient {
    client: Client,
    endpoints: OwnIpEndpoints,
}

impl OwnIpClient {
    /// Creates a detector sharing an existing HTTP client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            endpoints: OwnIpEndpoints::default(),
        }
    }

    /// Overrides the endpoint lists
    pub fn with_endpoints(mut self, endpoints: OwnIpEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Queries a single endpoint, returning a printable error on failure
    async fn query_endpoint(&self, url: &str, kind: IpKind) -> Result<IpAddr, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?;
        let text = response.text().await.map_err(|e| e.to_string())?;
        let answer = text.trim();

        let ip: IpAddr = answer
            .parse()
            .map_err(|_| format!("{} returned a non-IP answer: {:?}", url, answer))?;
        if !kind.matches(&ip) {
            return Err(format!("{} returned {}, which is not an {} address", url, ip, kind));
        }
        Ok(ip)
    }
}

#[async_trait]
impl OwnIpDetector for OwnIpClient {
    async fn detect(&self, kind: IpKind) -> Result<IpAddr, OwnIpError> {
        let mut last_error = None;

        for url in self.endpoints.for_kind(kind) {
            match self.query_endpoint(url, kind).await {
                Ok(ip) => {
                    debug!(%ip, url = url.as_str(), "detected own address");
                    return Ok(ip);
                }
                Err(e) => {
                    debug!(url = url.as_str(), error = %e, "own address endpoint failed");
                    last_error = Some(e);
                }
            }
        }

        let last_error = last_error.ok_or(OwnIpError::NoEndpoints(kind))?;
        Err(match kind {
            IpKind::Ipv6 => OwnIpError::Ipv6Unavailable { last_error },
            IpKind::Ipv4 => OwnIpError::Failed { kind, last_error },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn detector(ipv4: Vec<String>, ipv6: Vec<String>) -> OwnIpClient {
        OwnIpClient::with_client(Client::new()).with_endpoints(OwnIpEndpoints { ipv4, ipv6 })
    }

    #[tokio::test]
    async fn test_detect_ipv4_trims_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("192.0.2.1\n"))
            .mount(&server)
            .await;

        let ip = detector(vec![server.uri()], vec![])
            .detect(IpKind::Ipv4)
            .await
            .unwrap();

        assert_eq!(ip, "192.0.2.1".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_detect_ipv6_tries_next_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/first"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/second"))
            .respond_with(ResponseTemplate::new(200).set_body_string("2001:db8::1"))
            .expect(1)
            .mount(&server)
            .await;

        let ip = detector(
            vec![],
            vec![
                format!("{}/first", server.uri()),
                format!("{}/second", server.uri()),
            ],
        )
        .detect(IpKind::Ipv6)
        .await
        .unwrap();

        assert_eq!(ip, "2001:db8::1".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_detect_ipv6_unavailable_when_all_fail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = detector(vec![], vec![server.uri()])
            .detect(IpKind::Ipv6)
            .await
            .unwrap_err();

        assert!(matches!(err, OwnIpError::Ipv6Unavailable { .. }));
        assert!(err.to_string().contains("does not appear to support IPv6"));
    }

    #[tokio::test]
    async fn test_detect_rejects_wrong_family() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("192.0.2.1"))
            .mount(&server)
            .await;

        let err = detector(vec![], vec![server.uri()])
            .detect(IpKind::Ipv6)
            .await
            .unwrap_err();

        match err {
            OwnIpError::Ipv6Unavailable { last_error } => {
                assert!(last_error.contains("not an IPv6 address"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_detect_ipv4_failure_reports_last_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>blocked</html>"))
            .mount(&server)
            .await;

        let err = detector(vec![server.uri()], vec![])
            .detect(IpKind::Ipv4)
            .await
            .unwrap_err();

        match err {
            OwnIpError::Failed { kind, last_error } => {
                assert_eq!(kind, IpKind::Ipv4);
                assert!(last_error.contains("non-IP answer"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_detect_without_endpoints() {
        let err = detector(vec![], vec![]).detect(IpKind::Ipv4).await.unwrap_err();
        assert_eq!(err, OwnIpError::NoEndpoints(IpKind::Ipv4));
    }
}
