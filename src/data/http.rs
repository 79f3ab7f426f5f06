//! Shared GET handling for provider clients

use reqwest::{Client, StatusCode};
use tracing::debug;

use super::ProviderFailure;

/// Substitutes `{ip}` in a provider URL template
pub(crate) fn render_url(template: &str, ip: &str) -> String {
    template.replace("{ip}", ip)
}

/// Sends a GET and returns the body of a successful response
///
/// HTTP 429 maps to `RateLimited`; transport errors and any other
/// non-success status map to `TransportError`.
pub(crate) async fn get_body(
    client: &Client,
    url: &str,
    provider: &'static str,
) -> Result<String, ProviderFailure> {
    debug!(provider, url, "sending lookup request");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| transport(provider, e))?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderFailure::RateLimited { provider });
    }
    if !status.is_success() {
        return Err(ProviderFailure::TransportError {
            provider,
            message: format!("unexpected HTTP status {}", status),
        });
    }

    response.text().await.map_err(|e| transport(provider, e))
}

fn transport(provider: &'static str, error: reqwest::Error) -> ProviderFailure {
    ProviderFailure::TransportError {
        provider,
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_url_substitutes_ip() {
        assert_eq!(
            render_url("https://ipapi.co/{ip}/json/", "8.8.8.8"),
            "https://ipapi.co/8.8.8.8/json/"
        );
        assert_eq!(
            render_url("http://ip-api.com/json/{ip}", "2001:db8::1"),
            "http://ip-api.com/json/2001:db8::1"
        );
    }
}
