//! Browser cookie set required by the Kindle web reader.
//!
//! The web reader authenticates with four cookies copied from a logged-in
//! browser session. They can be supplied either as a structured value or as
//! the raw `Cookie` header string (`key=value; key=value`).

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, instrument};

/// Cookie name carrying the rotated session id in relay responses.
pub const SESSION_ID_COOKIE: &str = "session-id";

/// The four cookies the web reader requires.
///
/// Values are redacted in Debug output to prevent accidental logging of
/// credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct KindleCookies {
    at_main: String,
    session_id: String,
    ubid_main: String,
    x_main: String,
}

impl KindleCookies {
    /// Creates a cookie set from its four values.
    #[must_use]
    pub fn new(
        at_main: impl Into<String>,
        session_id: impl Into<String>,
        ubid_main: impl Into<String>,
        x_main: impl Into<String>,
    ) -> Self {
        Self {
            at_main: at_main.into(),
            session_id: session_id.into(),
            ubid_main: ubid_main.into(),
            x_main: x_main.into(),
        }
    }

    /// Parses a raw `Cookie` header string copied from a browser.
    ///
    /// Pairs are separated by `;` and split on the first `=`. Keys and values
    /// are trimmed and percent-decoded; cookies other than the four required
    /// ones are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CookieError::Missing`] listing every required cookie that
    /// was not found (or was empty).
    #[instrument(level = "debug", skip(raw))]
    pub fn parse(raw: &str) -> Result<Self, CookieError> {
        let values: HashMap<String, String> = raw
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .map(|(key, value)| (decode(key.trim()), decode(value.trim())))
            .collect();
        debug!(count = values.len(), "parsed cookie pairs");

        let mut missing = Vec::new();
        let mut take = |name: &'static str| match values.get(name) {
            Some(value) if !value.is_empty() => value.clone(),
            _ => {
                missing.push(name.to_string());
                String::new()
            }
        };

        let cookies = Self {
            at_main: take("at-main"),
            session_id: take(SESSION_ID_COOKIE),
            ubid_main: take("ubid-main"),
            x_main: take("x-main"),
        };

        if missing.is_empty() {
            Ok(cookies)
        } else {
            Err(CookieError::Missing { names: missing })
        }
    }

    /// Checks that no required cookie is empty.
    ///
    /// # Errors
    ///
    /// Returns [`CookieError::Missing`] naming the empty cookies.
    pub fn validate(&self) -> Result<(), CookieError> {
        let missing: Vec<String> = self
            .entries()
            .into_iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(name, _)| camel_to_kebab(name))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CookieError::Missing { names: missing })
        }
    }

    /// Serializes the set into a `Cookie` header value.
    ///
    /// Field names are camel case (`atMain`) and are rewritten to the
    /// kebab-case cookie names (`at-main`) on the wire.
    #[must_use]
    pub fn to_header_value(&self) -> String {
        self.entries()
            .into_iter()
            .map(|(name, value)| format!("{}={value}", camel_to_kebab(name)))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn entries(&self) -> [(&'static str, &str); 4] {
        [
            ("atMain", &self.at_main),
            ("sessionId", &self.session_id),
            ("ubidMain", &self.ubid_main),
            ("xMain", &self.x_main),
        ]
    }
}

// Custom Debug impl that redacts the cookie values.
impl fmt::Debug for KindleCookies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindleCookies")
            .field("at_main", &"[REDACTED]")
            .field("session_id", &"[REDACTED]")
            .field("ubid_main", &"[REDACTED]")
            .field("x_main", &"[REDACTED]")
            .finish()
    }
}

/// Errors that can occur while building a cookie set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CookieError {
    /// One or more required cookies are absent.
    #[error("missing required cookies: {}", names.join(", "))]
    Missing {
        /// Wire names of the missing cookies (e.g. `at-main`).
        names: Vec<String>,
    },
}

/// Rewrites camel-case boundaries to kebab case (`ubidMain` -> `ubid-main`).
#[must_use]
pub fn camel_to_kebab(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn decode(value: &str) -> String {
    urlencoding::decode(value).map_or_else(|_| value.to_string(), |decoded| decoded.into_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_to_kebab_rewrites_boundaries() {
        assert_eq!(camel_to_kebab("atMain"), "at-main");
        assert_eq!(camel_to_kebab("sessionId"), "session-id");
        assert_eq!(camel_to_kebab("xMain"), "x-main");
        assert_eq!(camel_to_kebab("plain"), "plain");
    }

    #[test]
    fn test_header_value_uses_kebab_names_in_order() {
        let cookies = KindleCookies::new("a", "2", "3", "4");
        assert_eq!(
            cookies.to_header_value(),
            "at-main=a; session-id=2; ubid-main=3; x-main=4"
        );
    }

    #[test]
    fn test_header_value_contains_at_main() {
        let cookies = KindleCookies::new("Atza|token", "2", "3", "4");
        assert!(cookies.to_header_value().contains("at-main=Atza|token"));
    }

    #[test]
    fn test_parse_browser_cookie_string() {
        let raw = "ubid-main=3; session-id=2; other=ignored; at-main=a; x-main=%224%22";
        let cookies = KindleCookies::parse(raw).unwrap();
        assert_eq!(cookies, KindleCookies::new("a", "2", "3", "\"4\""));
    }

    #[test]
    fn test_parse_keeps_equals_in_value() {
        let raw = "at-main=Atza|abc==; session-id=2; ubid-main=3; x-main=4";
        let cookies = KindleCookies::parse(raw).unwrap();
        assert!(cookies.to_header_value().starts_with("at-main=Atza|abc==;"));
    }

    #[test]
    fn test_parse_reports_all_missing_cookies() {
        let err = KindleCookies::parse("session-id=2; ubid-main=3").unwrap_err();
        assert_eq!(
            err,
            CookieError::Missing {
                names: vec!["at-main".to_string(), "x-main".to_string()]
            }
        );
        let msg = err.to_string();
        assert!(msg.contains("at-main"), "Expected at-main in: {msg}");
        assert!(msg.contains("x-main"), "Expected x-main in: {msg}");
    }

    #[test]
    fn test_parse_empty_value_counts_as_missing() {
        let err = KindleCookies::parse("at-main=; session-id=2; ubid-main=3; x-main=4").unwrap_err();
        assert_eq!(
            err,
            CookieError::Missing {
                names: vec!["at-main".to_string()]
            }
        );
    }

    #[test]
    fn test_validate_structured_set() {
        assert!(KindleCookies::new("a", "2", "3", "4").validate().is_ok());
        let err = KindleCookies::new("a", "", "3", "4").validate().unwrap_err();
        assert_eq!(
            err,
            CookieError::Missing {
                names: vec!["session-id".to_string()]
            }
        );
    }

    #[test]
    fn test_debug_redacts_values() {
        let cookies = KindleCookies::new("secret-at", "secret-session", "secret-ubid", "secret-x");
        let debug = format!("{cookies:?}");
        assert!(!debug.contains("secret"), "Debug leaked a value: {debug}");
        assert!(debug.contains("[REDACTED]"));
    }
}
