//! Session-aware HTTP adapter over the forwarding relay.
//!
//! [`HttpClient`] attaches the browser cookies, browser identity headers and
//! the two session tokens to every request, and offers helpers for the
//! response shapes the web reader uses.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::auth::KindleCookies;
use crate::error::KindleError;
use crate::user_agent::{BROWSER_ACCEPT_LANGUAGE, BROWSER_USER_AGENT};
use crate::utils::compile_static_regex;

use super::relay::{ForwardRequest, ForwardResponse, ForwardTransport};

/// Header carrying the rotating session id.
pub const SESSION_ID_HEADER: &str = "x-amzn-sessionid";

/// Header carrying the device session (ADP) token.
pub const ADP_SESSION_HEADER: &str = "x-adp-session-token";

static CALLBACK_WRAPPED_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?s)\((\{.*\})\)"));

/// Mutable session credentials shared by every request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Session id, rotated by every listing call.
    pub session_id: Option<String>,
    /// Device session token from the device-token exchange.
    pub adp_session_token: Option<String>,
}

/// Transport adapter shared by the catalog handle and every book record.
///
/// Session state lives behind a lock so the adapter can be shared through an
/// `Arc` while the bootstrapper and `books()` refresh the session id.
pub struct HttpClient {
    cookies: KindleCookies,
    transport: Arc<dyn ForwardTransport>,
    session: RwLock<SessionState>,
}

impl HttpClient {
    /// Creates an adapter with no session tokens recorded.
    #[must_use]
    pub fn new(cookies: KindleCookies, transport: Arc<dyn ForwardTransport>) -> Self {
        Self {
            cookies,
            transport,
            session: RwLock::new(SessionState::default()),
        }
    }

    /// Issues a GET for `url` through the relay.
    ///
    /// # Errors
    ///
    /// Returns the relay's [`KindleError`] unchanged. The response status is
    /// not inspected here.
    pub async fn request(&self, url: &str) -> Result<ForwardResponse, KindleError> {
        self.request_with_headers(url, &[]).await
    }

    /// Issues a GET with additional headers.
    ///
    /// Extra headers override the defaults, session headers are applied last.
    ///
    /// # Errors
    ///
    /// Returns the relay's [`KindleError`] unchanged.
    #[instrument(level = "debug", skip(self, extra_headers), fields(url = %url))]
    pub async fn request_with_headers(
        &self,
        url: &str,
        extra_headers: &[(&str, &str)],
    ) -> Result<ForwardResponse, KindleError> {
        let headers = self.build_headers(extra_headers);
        debug!(header_count = headers.len(), "forwarding request");
        self.transport
            .forward(ForwardRequest::get(url, headers))
            .await
    }

    /// Builds the header map for one request.
    #[must_use]
    pub fn build_headers(&self, extra_headers: &[(&str, &str)]) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        headers.insert("Cookie".to_string(), self.cookies.to_header_value());
        headers.insert(
            "Accept-Language".to_string(),
            BROWSER_ACCEPT_LANGUAGE.to_string(),
        );
        headers.insert("User-Agent".to_string(), BROWSER_USER_AGENT.to_string());
        for (name, value) in extra_headers {
            headers.insert((*name).to_string(), (*value).to_string());
        }

        let session = self.session();
        if let Some(session_id) = session.session_id {
            headers.insert(SESSION_ID_HEADER.to_string(), session_id);
        }
        if let Some(token) = session.adp_session_token {
            headers.insert(ADP_SESSION_HEADER.to_string(), token);
        }
        headers
    }

    /// Records the session id sent with subsequent requests.
    pub fn update_session(&self, id: impl Into<String>) {
        self.session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .session_id = Some(id.into());
    }

    /// Records the device session token sent with subsequent requests.
    pub fn update_adp_session(&self, token: impl Into<String>) {
        self.session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .adp_session_token = Some(token.into());
    }

    /// Returns a snapshot of the current session credentials.
    #[must_use]
    pub fn session(&self) -> SessionState {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the cookies the response reported as newly set.
    ///
    /// Combines the relay's parsed cookie map with any raw `Set-Cookie`
    /// headers; the parsed map wins on conflicts.
    #[must_use]
    pub fn extract_set_cookies(response: &ForwardResponse) -> HashMap<String, String> {
        let mut cookies: HashMap<String, String> = response
            .header_values("Set-Cookie")
            .iter()
            .filter_map(|set_cookie| {
                let pair = set_cookie.split(';').next()?;
                let (name, value) = pair.split_once('=')?;
                Some((name.trim().to_string(), value.trim().to_string()))
            })
            .collect();
        cookies.extend(
            response
                .cookies
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        cookies
    }

    /// Parses a body wrapped as `(<json>)`.
    ///
    /// Returns `None` when the wrapper is absent or the payload does not
    /// decode as `T`; callers decide whether that is fatal.
    #[must_use]
    pub fn parse_encoded_body<T: DeserializeOwned>(response: &ForwardResponse) -> Option<T> {
        let payload = CALLBACK_WRAPPED_RE
            .captures(&response.body)
            .and_then(|caps| caps.get(1))?;
        match serde_json::from_str(payload.as_str()) {
            Ok(value) => Some(value),
            Err(error) => {
                debug!(error = %error, "callback-wrapped payload is not valid JSON");
                None
            }
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.session();
        f.debug_struct("HttpClient")
            .field("cookies", &self.cookies)
            .field("has_session_id", &session.session_id.is_some())
            .field("has_adp_session_token", &session.adp_session_token.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde::Deserialize;

    use super::*;

    /// Records forwarded requests and answers with a fixed response.
    #[derive(Default)]
    struct RecordingTransport {
        requests: Mutex<Vec<ForwardRequest>>,
    }

    #[async_trait]
    impl ForwardTransport for RecordingTransport {
        async fn forward(&self, request: ForwardRequest) -> Result<ForwardResponse, KindleError> {
            self.requests.lock().unwrap().push(request);
            Ok(ForwardResponse {
                status: 200,
                ..ForwardResponse::default()
            })
        }
    }

    fn client_with(transport: Arc<RecordingTransport>) -> HttpClient {
        HttpClient::new(KindleCookies::new("a", "2", "3", "4"), transport)
    }

    fn body(text: &str) -> ForwardResponse {
        ForwardResponse {
            status: 200,
            body: text.to_string(),
            ..ForwardResponse::default()
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        value: u32,
    }

    #[test]
    fn test_request_attaches_cookie_and_browser_headers() {
        let transport = Arc::new(RecordingTransport::default());
        let client = client_with(Arc::clone(&transport));

        tokio_test::block_on(client.request("https://read.amazon.com/x")).unwrap();

        let requests = transport.requests.lock().unwrap();
        let headers = &requests[0].headers;
        assert_eq!(
            headers["Cookie"],
            "at-main=a; session-id=2; ubid-main=3; x-main=4"
        );
        assert_eq!(headers["User-Agent"], BROWSER_USER_AGENT);
        assert_eq!(headers["Accept-Language"], BROWSER_ACCEPT_LANGUAGE);
        assert!(!headers.contains_key(SESSION_ID_HEADER));
        assert!(!headers.contains_key(ADP_SESSION_HEADER));
        assert_eq!(requests[0].request_url, "https://read.amazon.com/x");
    }

    #[tokio::test]
    async fn test_session_headers_are_independent() {
        let transport = Arc::new(RecordingTransport::default());
        let client = client_with(Arc::clone(&transport));

        client.update_session("sess-1");
        client.request("https://read.amazon.com/a").await.unwrap();
        client.update_adp_session("adp-1");
        client.update_session("sess-2");
        client.request("https://read.amazon.com/b").await.unwrap();

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].headers[SESSION_ID_HEADER], "sess-1");
        assert!(!requests[0].headers.contains_key(ADP_SESSION_HEADER));
        assert_eq!(requests[1].headers[SESSION_ID_HEADER], "sess-2");
        assert_eq!(requests[1].headers[ADP_SESSION_HEADER], "adp-1");
    }

    #[test]
    fn test_extra_headers_cannot_replace_session_headers() {
        let client = client_with(Arc::new(RecordingTransport::default()));
        client.update_session("sess");
        let headers = client.build_headers(&[("Accept", "application/json"), (SESSION_ID_HEADER, "spoof")]);
        assert_eq!(headers["Accept"], "application/json");
        assert_eq!(headers[SESSION_ID_HEADER], "sess");
    }

    #[test]
    fn test_extract_set_cookies_merges_sources() {
        let mut response = body("");
        response.cookies.insert("session-id".to_string(), "2".to_string());
        response.headers.insert(
            "Set-Cookie".to_string(),
            vec![
                "session-id=stale; Path=/; Secure".to_string(),
                "ubid-main=9; Domain=.amazon.com".to_string(),
            ],
        );

        let cookies = HttpClient::extract_set_cookies(&response);
        assert_eq!(cookies["session-id"], "2");
        assert_eq!(cookies["ubid-main"], "9");
    }

    #[test]
    fn test_extract_set_cookies_empty_response() {
        assert!(HttpClient::extract_set_cookies(&body("{}")).is_empty());
    }

    #[test]
    fn test_parse_encoded_body_unwraps_callback() {
        let parsed: Option<Payload> = HttpClient::parse_encoded_body(&body(r#"({"value": 7})"#));
        assert_eq!(parsed, Some(Payload { value: 7 }));
    }

    #[test]
    fn test_parse_encoded_body_with_callback_name_and_newlines() {
        let parsed: Option<Payload> =
            HttpClient::parse_encoded_body(&body("loadMetadata({\n  \"value\": 3\n});"));
        assert_eq!(parsed, Some(Payload { value: 3 }));
    }

    #[test]
    fn test_parse_encoded_body_absent_wrapper() {
        let parsed: Option<Payload> = HttpClient::parse_encoded_body(&body(r#"{"value": 7}"#));
        assert_eq!(parsed, None);
        let parsed: Option<Payload> = HttpClient::parse_encoded_body(&body(""));
        assert_eq!(parsed, None);
    }

    #[test]
    fn test_parse_encoded_body_invalid_payload() {
        let parsed: Option<Payload> = HttpClient::parse_encoded_body(&body("({not json})"));
        assert_eq!(parsed, None);
    }

    #[test]
    fn test_debug_does_not_leak_tokens() {
        let client = client_with(Arc::new(RecordingTransport::default()));
        client.update_session("secret-session");
        client.update_adp_session("secret-token");
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret"), "Debug leaked a token: {debug}");
        assert!(debug.contains("has_session_id: true"));
    }
}
