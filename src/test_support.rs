//! Stub providers shared by unit tests

use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::data::{GeoResolver, IpKind, LookupResult, OwnIpDetector, OwnIpError, ProviderFailure};

pub(crate) fn sample_result(ip: &str, city: &str) -> LookupResult {
    LookupResult {
        ip: ip.to_string(),
        country: "United States".to_string(),
        country_code: "US".to_string(),
        city: city.to_string(),
        lat: 37.4056,
        lon: -122.0775,
        org: "Google LLC".to_string(),
        asn: "AS15169".to_string(),
    }
}

/// Resolver returning a fixed outcome and recording every call
pub(crate) struct StubResolver {
    name: &'static str,
    outcome: Result<LookupResult, ProviderFailure>,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl StubResolver {
    pub(crate) fn answering(name: &'static str, result: LookupResult) -> Self {
        Self::with_outcome(name, Ok(result))
    }

    pub(crate) fn failing(name: &'static str, failure: ProviderFailure) -> Self {
        Self::with_outcome(name, Err(failure))
    }

    pub(crate) fn rate_limited(name: &'static str) -> Self {
        Self::failing(name, ProviderFailure::RateLimited { provider: name })
    }

    fn with_outcome(name: &'static str, outcome: Result<LookupResult, ProviderFailure>) -> Self {
        Self {
            name,
            outcome,
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub(crate) fn seen(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.seen)
    }
}

#[async_trait]
impl GeoResolver for StubResolver {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn resolve(&self, ip: &str, _kind: IpKind) -> Result<LookupResult, ProviderFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(ip.to_string());
        self.outcome.clone()
    }
}

/// Own-address detector returning a fixed answer
pub(crate) struct StubOwnIp {
    answer: Result<IpAddr, OwnIpError>,
    calls: Arc<AtomicUsize>,
}

impl StubOwnIp {
    pub(crate) fn answering(ip: &str) -> Self {
        Self {
            answer: Ok(ip.parse().unwrap()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn failing(error: OwnIpError) -> Self {
        Self {
            answer: Err(error),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl OwnIpDetector for StubOwnIp {
    async fn detect(&self, _kind: IpKind) -> Result<IpAddr, OwnIpError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }
}
