//! Runtime configuration for lookups
//!
//! All settings are carried in explicit structs that are handed to the
//! provider clients and the lookup pipeline when they are constructed.
//! Nothing here touches process-wide state.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::{Client, Proxy};
use thiserror::Error;

use crate::cache::DEFAULT_TTL_HOURS;
use crate::data::ip_api::IP_API_URL_TEMPLATE;
use crate::data::ipapi_co::IPAPI_CO_URL_TEMPLATE;
use crate::data::IpKind;

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Errors raised while turning configuration into live clients
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The proxy URL could not be parsed
    #[error("invalid proxy URL '{proxy}': {source}")]
    InvalidProxy {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// No cache location was given and none could be derived
    #[error("could not determine a cache directory; pass --cache-file")]
    NoCacheDir,
}

/// Settings applied to every outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Proxy URL used for all schemes
    pub proxy: Option<String>,
    /// Whether TLS certificates are validated
    pub verify_tls: bool,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            verify_tls: true,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl HttpConfig {
    /// Builds a `reqwest::Client` honouring these settings
    ///
    /// Certificate validation is disabled only on the returned client when
    /// `verify_tls` is false.
    pub fn build_client(&self) -> Result<Client, ConfigError> {
        let mut builder = Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("ipscope/", env!("CARGO_PKG_VERSION")));

        if let Some(ref proxy) = self.proxy {
            let proxy_cfg = Proxy::all(proxy.as_str()).map_err(|source| ConfigError::InvalidProxy {
                proxy: proxy.clone(),
                source,
            })?;
            builder = builder.proxy(proxy_cfg);
        }

        if !self.verify_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder.build().map_err(ConfigError::Client)
    }
}

/// URL templates for the geolocation providers; `{ip}` is substituted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub primary: String,
    pub secondary: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            primary: IPAPI_CO_URL_TEMPLATE.to_string(),
            secondary: IP_API_URL_TEMPLATE.to_string(),
        }
    }
}

/// "What is my IP" endpoints, tried in order per family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnIpEndpoints {
    pub ipv4: Vec<String>,
    pub ipv6: Vec<String>,
}

impl Default for OwnIpEndpoints {
    fn default() -> Self {
        Self {
            ipv4: vec!["https://api.ipify.org".to_string()],
            ipv6: vec![
                "https://api6.ipify.org".to_string(),
                "https://ipv6.icanhazip.com".to_string(),
            ],
        }
    }
}

impl OwnIpEndpoints {
    pub fn for_kind(&self, kind: IpKind) -> &[String] {
        match kind {
            IpKind::Ipv4 => &self.ipv4,
            IpKind::Ipv6 => &self.ipv6,
        }
    }
}

/// Everything needed to assemble a `LookupPipeline`
#[derive(Debug, Clone)]
pub struct LookupConfig {
    pub http: HttpConfig,
    pub providers: ProviderEndpoints,
    pub own_ip: OwnIpEndpoints,
    /// Cache file location; `None` uses the XDG cache directory
    pub cache_path: Option<PathBuf>,
    /// Maximum age of a cache entry
    pub cache_ttl: chrono::Duration,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            providers: ProviderEndpoints::default(),
            own_ip: OwnIpEndpoints::default(),
            cache_path: None,
            cache_ttl: chrono::Duration::hours(DEFAULT_TTL_HOURS),
        }
    }
}
