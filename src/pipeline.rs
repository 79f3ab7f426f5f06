//! Lookup pipeline
//!
//! Runs one query start to finish:
//!
//! 1. Work out the address: the target IP if given, otherwise the caller's own.
//! 2. Serve a fresh cache entry if caching is enabled.
//! 3. Otherwise ask the providers through the `FallbackCoordinator`.
//! 4. Write successful answers back to the cache, even when the cache read was
//!    skipped, so later runs benefit.

use std::net::IpAddr;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, DiskCache};
use crate::config::{ConfigError, LookupConfig};
use crate::data::{
    IpApiClient, IpApiCoClient, IpKind, LookupResult, OwnIpClient, OwnIpDetector, OwnIpError,
    ProviderFailure,
};
use crate::fallback::FallbackCoordinator;

/// A single lookup request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Address family to detect (and to key the cache by)
    pub ip_kind: IpKind,
    /// Address to look up instead of the caller's own
    pub target_ip: Option<String>,
    /// Whether a fresh cache entry may be served
    pub use_cache: bool,
}

impl Query {
    /// Looks up the caller's own public address
    pub fn own(ip_kind: IpKind) -> Self {
        Self {
            ip_kind,
            target_ip: None,
            use_cache: true,
        }
    }

    /// Looks up a specific address
    pub fn target(ip_kind: IpKind, target_ip: impl Into<String>) -> Self {
        Self {
            ip_kind,
            target_ip: Some(target_ip.into()),
            use_cache: true,
        }
    }

    /// Skips the cache read; the result is still written back
    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }
}

/// Where a result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    /// A fresh cache entry
    Cache,
    /// A provider, by name
    Provider(&'static str),
}

/// The answer to a query
#[derive(Debug, Clone, PartialEq)]
pub struct LookupOutcome {
    /// The address that was looked up
    pub ip: IpAddr,
    pub result: LookupResult,
    pub source: ResultSource,
}

/// Errors surfaced to the user, one per failing stage
#[derive(Debug, Error)]
pub enum LookupError {
    /// The query was rejected before any network call
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The caller's own address could not be detected
    #[error("own IP detection failed: {0}")]
    OwnIp(#[from] OwnIpError),

    /// Both providers rate limited the request
    #[error("geolocation lookup failed: rate limited by {primary} and by fallback {secondary}")]
    Exhausted {
        primary: &'static str,
        secondary: &'static str,
    },

    /// The primary rate limited the request and the fallback then failed
    #[error("geolocation lookup failed: {primary} rate limited the request and fallback failed: {failure}")]
    FallbackFailed {
        primary: &'static str,
        failure: ProviderFailure,
    },

    /// A provider failed for a reason other than rate limiting
    #[error("geolocation lookup failed: {0}")]
    Provider(ProviderFailure),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Resolves, caches, and enriches IP addresses
pub struct LookupPipeline {
    own_ip: Box<dyn OwnIpDetector>,
    coordinator: FallbackCoordinator,
    cache: DiskCache,
}

impl LookupPipeline {
    pub fn new(
        own_ip: Box<dyn OwnIpDetector>,
        coordinator: FallbackCoordinator,
        cache: DiskCache,
    ) -> Self {
        Self {
            own_ip,
            coordinator,
            cache,
        }
    }

    /// Builds the production pipeline from `config`
    ///
    /// One HTTP client is shared by the own-IP detector and both providers.
    pub fn from_config(config: &LookupConfig) -> Result<Self, ConfigError> {
        let client = config.http.build_client()?;

        let own_ip = OwnIpClient::with_client(client.clone()).with_endpoints(config.own_ip.clone());
        let primary =
            IpApiCoClient::with_client(client.clone()).with_url_template(&config.providers.primary);
        let secondary =
            IpApiClient::with_client(client).with_url_template(&config.providers.secondary);

        let cache = match config.cache_path {
            Some(ref path) => DiskCache::with_path(path.clone()),
            None => DiskCache::new().ok_or(ConfigError::NoCacheDir)?,
        }
        .with_ttl(config.cache_ttl);

        Ok(Self::new(
            Box::new(own_ip),
            FallbackCoordinator::new(Box::new(primary), Box::new(secondary)),
            cache,
        ))
    }

    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    /// Runs `query` to completion
    pub async fn run(&self, query: &Query) -> Result<LookupOutcome, LookupError> {
        let ip = self.resolve_ip(query).await?;
        let ip_str = ip.to_string();
        let key = CacheKey::new(&ip_str, query.ip_kind);

        if query.use_cache {
            match self.cache.get(&key) {
                Some(entry) if self.cache.is_fresh(&entry, Utc::now()) => {
                    info!(%key, fetched_at = %entry.fetched_at, "serving cached result");
                    return Ok(LookupOutcome {
                        ip,
                        result: entry.payload,
                        source: ResultSource::Cache,
                    });
                }
                Some(entry) => debug!(%key, fetched_at = %entry.fetched_at, "cache entry expired"),
                None => debug!(%key, "cache miss"),
            }
        } else {
            debug!(%key, "cache read skipped");
        }

        let fetched = self
            .coordinator
            .fetch(&ip_str, query.ip_kind)
            .await
            .map_err(|failure| self.classify(failure))?;

        if let Err(e) = self.cache.put(&key, &fetched.result, Utc::now()) {
            warn!(%key, error = %e, "failed to update cache");
        }

        Ok(LookupOutcome {
            ip,
            result: fetched.result,
            source: ResultSource::Provider(fetched.provider),
        })
    }

    /// Picks the address to look up, validating a target before any network call
    async fn resolve_ip(&self, query: &Query) -> Result<IpAddr, LookupError> {
        match query.target_ip {
            Some(ref target) => {
                let ip: IpAddr = target.trim().parse().map_err(|_| {
                    LookupError::InvalidQuery(format!("'{}' is not a valid IP address", target))
                })?;
                if !query.ip_kind.matches(&ip) {
                    debug!(%ip, kind = %query.ip_kind, "target address family differs from requested kind");
                }
                Ok(ip)
            }
            None => Ok(self.own_ip.detect(query.ip_kind).await?),
        }
    }

    fn classify(&self, failure: ProviderFailure) -> LookupError {
        // any failure from the secondary means the primary was rate limited first
        let primary = self.coordinator.primary_name();
        if failure.is_rate_limited() {
            LookupError::Exhausted {
                primary,
                secondary: self.coordinator.secondary_name(),
            }
        } else if failure.provider() != primary {
            LookupError::FallbackFailed { primary, failure }
        } else {
            LookupError::Provider(failure)
        }
    }
}
