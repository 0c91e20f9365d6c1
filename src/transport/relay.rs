//! TLS-fingerprinting forwarding relay contract.
//!
//! The web reader rejects clients whose TLS handshake does not look like a
//! browser. Requests are therefore not sent directly: they are POSTed as JSON
//! to a relay which performs the real exchange with a browser fingerprint and
//! reports the upstream response back as JSON.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, instrument};

use crate::error::KindleError;
use crate::user_agent;

/// Browser fingerprint profile requested from the relay.
pub const TLS_CLIENT_IDENTIFIER: &str = "chrome_112";

/// Relay path that forwards a single request.
const FORWARD_PATH: &str = "/api/forward";

/// Header carrying the relay API key.
const API_KEY_HEADER: &str = "x-api-key";

/// Connection settings for the forwarding relay.
#[derive(Clone)]
pub struct TlsServerConfig {
    /// Relay base URL, e.g. `http://localhost:8080`.
    pub url: String,
    /// Relay API key.
    pub api_key: String,
    /// Optional overall deadline for one forwarded request.
    pub timeout: Option<Duration>,
}

impl TlsServerConfig {
    /// Creates relay settings without a request deadline.
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            timeout: None,
        }
    }

    /// Sets the per-request deadline enforced by the relay client.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl std::fmt::Debug for TlsServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsServerConfig")
            .field("url", &self.url)
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Request body accepted by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardRequest {
    /// Browser fingerprint profile.
    pub tls_client_identifier: String,
    /// Upstream URL to fetch.
    pub request_url: String,
    /// Upstream HTTP method.
    pub request_method: String,
    /// Ask the relay to include debug information.
    pub with_debug: bool,
    /// Headers sent upstream.
    pub headers: BTreeMap<String, String>,
}

impl ForwardRequest {
    /// Creates a GET request with the fixed fingerprint settings.
    pub fn get(request_url: impl Into<String>, headers: BTreeMap<String, String>) -> Self {
        Self {
            tls_client_identifier: TLS_CLIENT_IDENTIFIER.to_string(),
            request_url: request_url.into(),
            request_method: "GET".to_string(),
            with_debug: true,
            headers,
        }
    }
}

/// Upstream response as reported by the relay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardResponse {
    /// Upstream HTTP status.
    pub status: u16,
    /// Upstream headers; the relay reports single values or lists.
    #[serde(default, deserialize_with = "deserialize_headers")]
    pub headers: HashMap<String, Vec<String>>,
    /// Cookies the upstream response set.
    #[serde(default)]
    pub cookies: HashMap<String, String>,
    /// Upstream body as text.
    #[serde(default)]
    pub body: String,
    /// Final upstream URL.
    #[serde(default)]
    pub target: Option<String>,
}

impl ForwardResponse {
    /// Returns all values of a header, matching the name case-insensitively.
    #[must_use]
    pub fn header_values(&self, name: &str) -> &[String] {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map_or(&[], |(_, values)| values.as_slice())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HeaderValues {
    One(String),
    Many(Vec<String>),
}

fn deserialize_headers<'de, D>(deserializer: D) -> Result<HashMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<HashMap<String, HeaderValues>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(name, values)| match values {
            HeaderValues::One(value) => (name, vec![value]),
            HeaderValues::Many(values) => (name, values),
        })
        .collect())
}

/// Exchange seam between the session adapter and the relay.
///
/// The default implementation is [`TlsRelayClient`]; callers may supply their
/// own (for instance a relay reached through a different contract).
#[async_trait]
pub trait ForwardTransport: Send + Sync {
    /// Forwards one request and returns the upstream response.
    async fn forward(&self, request: ForwardRequest) -> Result<ForwardResponse, KindleError>;
}

/// [`ForwardTransport`] that POSTs to a relay over plain HTTP.
#[derive(Clone)]
pub struct TlsRelayClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl TlsRelayClient {
    /// Builds a relay client from connection settings.
    ///
    /// # Errors
    ///
    /// Returns [`KindleError::Configuration`] when the relay URL is not a
    /// valid URL, or [`KindleError::Relay`] when the HTTP client cannot be
    /// constructed.
    pub fn new(config: &TlsServerConfig) -> Result<Self, KindleError> {
        let base = url::Url::parse(&config.url).map_err(|error| {
            KindleError::configuration(format!("invalid relay URL '{}': {error}", config.url))
        })?;
        let endpoint = format!("{}{FORWARD_PATH}", base.as_str().trim_end_matches('/'));

        let mut builder = Client::builder()
            .user_agent(user_agent::relay_user_agent())
            .gzip(true);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|source| KindleError::relay(endpoint.clone(), source))?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
        })
    }

    /// Returns the relay forward endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl std::fmt::Debug for TlsRelayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsRelayClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ForwardTransport for TlsRelayClient {
    #[instrument(level = "debug", skip(self, request), fields(url = %request.request_url))]
    async fn forward(&self, request: ForwardRequest) -> Result<ForwardResponse, KindleError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|source| KindleError::relay(self.endpoint.clone(), source))?;

        let status = response.status();
        if !status.is_success() {
            return Err(KindleError::relay_status(
                self.endpoint.clone(),
                status.as_u16(),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|source| KindleError::relay(self.endpoint.clone(), source))?;
        let forwarded: ForwardResponse = serde_json::from_str(&body)
            .map_err(|source| KindleError::decode(self.endpoint.clone(), source))?;
        debug!(status = forwarded.status, "relay response received");
        Ok(forwarded)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_request_wire_shape() {
        let mut headers = BTreeMap::new();
        headers.insert("Cookie".to_string(), "at-main=a".to_string());
        let request = ForwardRequest::get("https://read.amazon.com/x", headers);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["tlsClientIdentifier"], "chrome_112");
        assert_eq!(value["requestUrl"], "https://read.amazon.com/x");
        assert_eq!(value["requestMethod"], "GET");
        assert_eq!(value["withDebug"], true);
        assert_eq!(value["headers"]["Cookie"], "at-main=a");
    }

    #[test]
    fn test_forward_response_accepts_single_and_list_headers() {
        let body = r#"{
            "status": 302,
            "headers": {"Location": ["https://www.amazon.com/ap/signin"], "Content-Type": "text/html"},
            "cookies": {"session-id": "2"},
            "body": "{}",
            "target": "https://read.amazon.com/kindle-library/search"
        }"#;
        let response: ForwardResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.status, 302);
        assert_eq!(
            response.header_values("location"),
            ["https://www.amazon.com/ap/signin".to_string()]
        );
        assert_eq!(response.header_values("content-type"), ["text/html".to_string()]);
        assert_eq!(response.cookies.get("session-id").unwrap(), "2");
    }

    #[test]
    fn test_forward_response_optional_fields_default() {
        let response: ForwardResponse =
            serde_json::from_str(r#"{"status": 200, "headers": null}"#).unwrap();
        assert!(response.headers.is_empty());
        assert!(response.cookies.is_empty());
        assert!(response.body.is_empty());
        assert!(response.target.is_none());
        assert!(response.header_values("Location").is_empty());
    }

    #[test]
    fn test_relay_client_endpoint_and_invalid_url() {
        let client = TlsRelayClient::new(&TlsServerConfig::new("http://localhost:8080/", "key")).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/api/forward");

        let err = TlsRelayClient::new(&TlsServerConfig::new("not a url", "key")).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }

    #[test]
    fn test_tls_server_config_debug_redacts_key() {
        let config = TlsServerConfig::new("http://localhost:8080", "super-secret");
        assert!(!format!("{config:?}").contains("super-secret"));
    }
}
