//! User-Agent and language strings sent to the relay and to the web reader.
//!
//! The web reader sees the browser strings below (forwarded by the relay with a
//! matching TLS fingerprint). The relay itself sees a User-Agent identifying
//! this tool.

/// Project URL for User-Agent identification towards the relay.
const PROJECT_UA_URL: &str = "https://github.com/fierce/kindle-library";

/// Browser User-Agent forwarded to the web reader.
///
/// Must stay consistent with the `chrome_112` TLS fingerprint requested from
/// the relay.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/112.0.0.0 Safari/537.36";

/// `Accept-Language` forwarded to the web reader.
pub const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9,ko-KR;q=0.8,ko;q=0.7";

/// User-Agent for requests to the relay itself.
#[must_use]
pub(crate) fn relay_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("kindle-library/{version} (+{PROJECT_UA_URL})")
}
