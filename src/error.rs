//! Error types for Kindle library operations.
//!
//! Every operation that talks to the web reader returns [`KindleError`].
//! Nothing in the crate retries or swallows these errors; they reach the
//! caller of the operation that detected them.

use thiserror::Error;

use crate::auth::CookieError;
use crate::transport::ForwardResponse;

/// Coarse error category for callers that branch on the kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or incomplete configuration, raised before any network call.
    Configuration,
    /// The web reader redirected to the sign-in page.
    SessionExpired,
    /// The web reader answered outside the 2xx range.
    UnexpectedResponse,
    /// The listing call did not rotate a session id.
    MissingSession,
    /// The metadata lookup body was not callback-wrapped JSON.
    MalformedMetadata,
    /// The forwarding relay could not be reached or rejected the request.
    Transport,
    /// An upstream body was not the expected JSON.
    Decode,
}

/// Errors that can occur while talking to the Kindle web reader.
#[derive(Debug, Error)]
pub enum KindleError {
    /// Configuration is invalid or incomplete.
    #[error("invalid configuration: {reason}")]
    Configuration {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// The cookie session is no longer valid.
    ///
    /// Refresh the browser cookies and bootstrap a new session.
    #[error("session expired: redirected to sign-in at {location}")]
    SessionExpired {
        /// The sign-in URL the web reader redirected to.
        location: String,
        /// The raw relay response for inspection.
        response: Box<ForwardResponse>,
    },

    /// The web reader returned a status outside 200-299.
    #[error("Unexpected status code: {status}")]
    UnexpectedResponse {
        /// The HTTP status code reported by the relay.
        status: u16,
        /// The raw relay response for inspection.
        response: Box<ForwardResponse>,
    },

    /// A bootstrap call succeeded without reporting its session token: the
    /// `session-id` cookie of the listing or the device session token.
    #[error("no session token returned by {url}")]
    MissingSession {
        /// The URL that was requested.
        url: String,
    },

    /// The metadata lookup response could not be unwrapped.
    #[error("malformed book metadata from {url}: no callback-wrapped JSON payload")]
    MalformedMetadata {
        /// The metadata lookup URL.
        url: String,
    },

    /// Network-level failure reaching the forwarding relay.
    #[error("relay request to {endpoint} failed: {source}")]
    Relay {
        /// The relay endpoint.
        endpoint: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The forwarding relay itself answered with an error status.
    #[error("relay at {endpoint} responded with HTTP {status}")]
    RelayStatus {
        /// The relay endpoint.
        endpoint: String,
        /// The relay's own HTTP status.
        status: u16,
    },

    /// An upstream or relay body was not valid JSON of the expected shape.
    #[error("invalid JSON from {url}: {source}")]
    Decode {
        /// The URL whose body failed to decode.
        url: String,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

impl KindleError {
    /// Creates a configuration error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Creates a session-expired error carrying the raw response.
    #[must_use]
    pub fn session_expired(location: impl Into<String>, response: ForwardResponse) -> Self {
        Self::SessionExpired {
            location: location.into(),
            response: Box::new(response),
        }
    }

    /// Creates an unexpected-status error carrying the raw response.
    #[must_use]
    pub fn unexpected_status(response: ForwardResponse) -> Self {
        Self::UnexpectedResponse {
            status: response.status,
            response: Box::new(response),
        }
    }

    /// Creates a missing-session error.
    pub fn missing_session(url: impl Into<String>) -> Self {
        Self::MissingSession { url: url.into() }
    }

    /// Creates a malformed-metadata error.
    pub fn malformed_metadata(url: impl Into<String>) -> Self {
        Self::MalformedMetadata { url: url.into() }
    }

    /// Creates a relay network error.
    pub fn relay(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Relay {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// Creates a relay status error.
    pub fn relay_status(endpoint: impl Into<String>, status: u16) -> Self {
        Self::RelayStatus {
            endpoint: endpoint.into(),
            status,
        }
    }

    /// Creates a JSON decode error.
    pub fn decode(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::SessionExpired { .. } => ErrorKind::SessionExpired,
            Self::UnexpectedResponse { .. } => ErrorKind::UnexpectedResponse,
            Self::MissingSession { .. } => ErrorKind::MissingSession,
            Self::MalformedMetadata { .. } => ErrorKind::MalformedMetadata,
            Self::Relay { .. } | Self::RelayStatus { .. } => ErrorKind::Transport,
            Self::Decode { .. } => ErrorKind::Decode,
        }
    }

    /// Returns the raw relay response for response-classified errors.
    #[must_use]
    pub fn response(&self) -> Option<&ForwardResponse> {
        match self {
            Self::SessionExpired { response, .. } | Self::UnexpectedResponse { response, .. } => {
                Some(response)
            }
            _ => None,
        }
    }
}

impl From<CookieError> for KindleError {
    fn from(error: CookieError) -> Self {
        Self::configuration(error.to_string())
    }
}

// Note: no `From<reqwest::Error>` or `From<serde_json::Error>`. Those variants
// need the endpoint or URL, so callers go through the constructors.
