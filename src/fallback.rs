//! Primary/secondary provider coordination
//!
//! The primary provider is asked once. Only a rate-limit answer sends the
//! query to the secondary provider, which is also asked once; every other
//! failure is returned as-is.

use tracing::{debug, warn};

use crate::data::{GeoResolver, IpKind, LookupResult, ProviderFailure};

/// A successful answer and the provider that gave it
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub result: LookupResult,
    pub provider: &'static str,
}

/// Calls the primary provider and falls back to the secondary on rate limiting
pub struct FallbackCoordinator {
    primary: Box<dyn GeoResolver>,
    secondary: Box<dyn GeoResolver>,
}

impl FallbackCoordinator {
    pub fn new(primary: Box<dyn GeoResolver>, secondary: Box<dyn GeoResolver>) -> Self {
        Self { primary, secondary }
    }

    pub fn primary_name(&self) -> &'static str {
        self.primary.name()
    }

    pub fn secondary_name(&self) -> &'static str {
        self.secondary.name()
    }

    /// Resolves `ip`, trying the secondary provider only if the primary is rate limited
    pub async fn fetch(&self, ip: &str, kind: IpKind) -> Result<Fetched, ProviderFailure> {
        debug!(provider = self.primary.name(), ip, "querying primary provider");

        match self.primary.resolve(ip, kind).await {
            Ok(result) => Ok(Fetched {
                result,
                provider: self.primary.name(),
            }),
            Err(ProviderFailure::RateLimited { provider }) => {
                warn!(
                    "rate limit reached on {}, using fallback {}",
                    provider,
                    self.secondary.name()
                );
                let result = self.secondary.resolve(ip, kind).await?;
                Ok(Fetched {
                    result,
                    provider: self.secondary.name(),
                })
            }
            Err(failure) => Err(failure),
        }
    }
}
