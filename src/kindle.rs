//! Session bootstrap and the catalog handle.
//!
//! [`Kindle::from_config`] turns a browser cookie set and a device token into
//! a ready handle in two steps:
//!
//! 1. A default listing call, which rotates the `session-id` cookie and
//!    doubles as the default book list.
//! 2. The device-token exchange, which yields the device session (ADP) token
//!    required by per-book detail calls.
//!
//! Either step failing fails the bootstrap; there is no partial handle.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

use crate::auth::CookieInput;
use crate::book::KindleBook;
use crate::classify::check_response;
use crate::error::KindleError;
use crate::library::{Filter, Query, aggregate, listing_url};
use crate::transport::{ForwardTransport, HttpClient, TlsRelayClient, TlsServerConfig};

/// Worldwide web reader.
pub const DEFAULT_BASE_URL: &str = "https://read.amazon.com";

/// Client version sent to the book-detail endpoint.
pub const DEFAULT_CLIENT_VERSION: &str = "2000010";

/// Device-token exchange path below the base URL.
pub const DEVICE_TOKEN_PATH: &str = "service/web/register/getDeviceToken";

/// Configuration for [`Kindle::from_config`].
#[derive(Clone)]
pub struct KindleConfig {
    /// Browser cookies, raw or structured.
    pub cookies: CookieInput,
    /// Device token sent as both `serialNumber` and `deviceType`.
    pub device_token: String,
    /// Book-detail client version, default [`DEFAULT_CLIENT_VERSION`].
    pub client_version: Option<String>,
    /// Forwarding relay settings.
    pub tls_server: TlsServerConfig,
    /// Regional web reader, default [`DEFAULT_BASE_URL`]. Only the origin
    /// is used.
    pub base_url: Option<String>,
}

impl KindleConfig {
    /// Creates a configuration with default base URL and client version.
    pub fn new(
        cookies: impl Into<CookieInput>,
        device_token: impl Into<String>,
        tls_server: TlsServerConfig,
    ) -> Self {
        Self {
            cookies: cookies.into(),
            device_token: device_token.into(),
            client_version: None,
            tls_server,
            base_url: None,
        }
    }

    /// Targets a regional web reader, e.g. `https://lesen.amazon.de`.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Overrides the book-detail client version.
    #[must_use]
    pub fn with_client_version(mut self, client_version: impl Into<String>) -> Self {
        self.client_version = Some(client_version.into());
        self
    }
}

impl std::fmt::Debug for KindleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindleConfig")
            .field("cookies", &self.cookies)
            .field("device_token", &"[REDACTED]")
            .field("client_version", &self.client_version)
            .field("tls_server", &self.tls_server)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Device registration returned by the device-token exchange.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Opaque client hash assigned to this reader.
    #[serde(default)]
    pub client_hash_id: String,
    /// Display name of the registered device.
    #[serde(default)]
    pub device_name: String,
    /// ADP token sent as `x-adp-session-token` on per-book calls.
    pub device_session_token: String,
    /// Device entity id.
    #[serde(default)]
    pub eid: String,
}

impl std::fmt::Debug for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceInfo")
            .field("client_hash_id", &self.client_hash_id)
            .field("device_name", &self.device_name)
            .field("device_session_token", &"[REDACTED]")
            .field("eid", &self.eid)
            .finish()
    }
}

/// A bootstrapped session with the user's default book list.
#[derive(Debug)]
pub struct Kindle {
    base_url: Url,
    client: Arc<HttpClient>,
    client_version: String,
    default_books: Vec<KindleBook>,
    session_id: String,
    device: DeviceInfo,
}

impl Kindle {
    /// Bootstraps a session through the default relay client.
    ///
    /// # Errors
    ///
    /// Returns [`KindleError::Configuration`] for missing cookies, an empty
    /// device token or invalid URLs before any request is made, and any
    /// bootstrap request error unchanged.
    pub async fn from_config(config: KindleConfig) -> Result<Self, KindleError> {
        let relay = TlsRelayClient::new(&config.tls_server)?;
        Self::from_config_with_transport(config, Arc::new(relay)).await
    }

    /// Bootstraps a session through a caller-supplied relay transport.
    ///
    /// `config.tls_server` is ignored.
    ///
    /// # Errors
    ///
    /// Same as [`from_config`](Self::from_config); additionally
    /// [`KindleError::MissingSession`] when the listing call does not report
    /// a `session-id` cookie or the device exchange returns an empty session
    /// token.
    #[instrument(level = "debug", skip(config, transport))]
    pub async fn from_config_with_transport(
        config: KindleConfig,
        transport: Arc<dyn ForwardTransport>,
    ) -> Result<Self, KindleError> {
        let base_url = resolve_base_url(config.base_url.as_deref())?;
        let cookies = config.cookies.into_cookies()?;
        if config.device_token.trim().is_empty() {
            return Err(KindleError::configuration("device token must not be empty"));
        }
        let client_version = config
            .client_version
            .filter(|version| !version.is_empty())
            .unwrap_or_else(|| DEFAULT_CLIENT_VERSION.to_string());

        let client = Arc::new(HttpClient::new(cookies, transport));

        let (query, filter) = (Query::default(), Filter::default());
        let catalog = aggregate(&client, &base_url, &client_version, &query, &filter).await?;
        let Some(session_id) = catalog.session_id else {
            return Err(KindleError::missing_session(listing_url(
                &base_url, &query, &filter, None,
            )?));
        };
        client.update_session(session_id.clone());
        debug!(books = catalog.books.len(), "session id obtained");

        let device = Self::device_token(&client, &base_url, &config.device_token).await?;
        client.update_adp_session(device.device_session_token.clone());

        info!(
            base_url = %base_url,
            books = catalog.books.len(),
            device_name = %device.device_name,
            "kindle session established"
        );

        Ok(Self {
            base_url,
            client,
            client_version,
            default_books: catalog.books,
            session_id,
            device,
        })
    }

    /// Exchanges the device token for a device session.
    ///
    /// # Errors
    ///
    /// Returns a classified error for sign-in redirects and non-2xx
    /// responses, [`KindleError::Decode`] for an unexpected body, and
    /// [`KindleError::MissingSession`] when the device session token is empty.
    #[instrument(level = "debug", skip(client, token), fields(base_url = %base_url))]
    pub async fn device_token(
        client: &HttpClient,
        base_url: &Url,
        token: &str,
    ) -> Result<DeviceInfo, KindleError> {
        let url = device_token_url(base_url, token)?;
        let response = check_response(client.request(&url).await?)?;
        let device: DeviceInfo = serde_json::from_str(&response.body)
            .map_err(|source| KindleError::decode(&url, source))?;
        if device.device_session_token.trim().is_empty() {
            return Err(KindleError::missing_session(url));
        }
        Ok(device)
    }

    /// Lists books with the given order and filter.
    ///
    /// Refreshes the stored session id when the listing rotates it. The
    /// device session token is left untouched.
    ///
    /// # Errors
    ///
    /// Returns the first listing error unchanged.
    pub async fn books(
        &mut self,
        query: &Query,
        filter: &Filter,
    ) -> Result<Vec<KindleBook>, KindleError> {
        let catalog = aggregate(
            &self.client,
            &self.base_url,
            &self.client_version,
            query,
            filter,
        )
        .await?;
        if let Some(session_id) = catalog.session_id {
            self.client.update_session(session_id.clone());
            self.session_id = session_id;
        }
        Ok(catalog.books)
    }

    /// Books returned by the bootstrap listing call.
    #[must_use]
    pub fn default_books(&self) -> &[KindleBook] {
        &self.default_books
    }

    /// Finds a default book by ASIN.
    #[must_use]
    pub fn find_default_book(&self, asin: &str) -> Option<&KindleBook> {
        self.default_books.iter().find(|book| book.asin == asin)
    }

    /// Most recently observed session id.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Web reader origin all requests are built on.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Session adapter shared with every book record.
    #[must_use]
    pub fn client(&self) -> &Arc<HttpClient> {
        &self.client
    }

    /// Client version sent to the book-detail endpoint.
    #[must_use]
    pub fn client_version(&self) -> &str {
        &self.client_version
    }

    /// Device registration from the bootstrap exchange.
    #[must_use]
    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }
}

/// Reduces the configured base URL to its origin.
///
/// # Errors
///
/// Returns [`KindleError::Configuration`] for unparsable or non-HTTP URLs.
pub fn resolve_base_url(base_url: Option<&str>) -> Result<Url, KindleError> {
    let raw = base_url.unwrap_or(DEFAULT_BASE_URL);
    let url = Url::parse(raw)
        .map_err(|error| KindleError::configuration(format!("invalid base URL '{raw}': {error}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(KindleError::configuration(format!(
            "base URL '{raw}' must use http or https"
        )));
    }
    let origin = url.origin().ascii_serialization();
    Url::parse(&origin)
        .map_err(|error| KindleError::configuration(format!("invalid base URL '{raw}': {error}")))
}

/// Builds the device-token exchange URL.
///
/// # Errors
///
/// Returns [`KindleError::Configuration`] when `base_url` cannot be joined.
pub fn device_token_url(base_url: &Url, token: &str) -> Result<String, KindleError> {
    let mut url = base_url.join(DEVICE_TOKEN_PATH).map_err(|error| {
        KindleError::configuration(format!("invalid base URL '{base_url}': {error}"))
    })?;
    url.query_pairs_mut()
        .append_pair("serialNumber", token)
        .append_pair("deviceType", token);
    Ok(url.into())
}
