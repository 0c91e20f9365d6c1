//! Browser cookie authentication for the Kindle web reader.
//!
//! The web reader has no public login API; a session is bootstrapped from the
//! cookies of a logged-in browser.

mod cookies;

pub use cookies::{CookieError, KindleCookies, SESSION_ID_COOKIE, camel_to_kebab};

/// Cookie input accepted by the session bootstrapper.
#[derive(Clone)]
pub enum CookieInput {
    /// Raw `Cookie` header string copied from the browser.
    Raw(String),
    /// Already structured cookie set.
    Structured(KindleCookies),
}

impl CookieInput {
    /// Normalizes the input into a validated cookie set.
    ///
    /// # Errors
    ///
    /// Returns [`CookieError`] when any required cookie is missing.
    pub fn into_cookies(self) -> Result<KindleCookies, CookieError> {
        match self {
            Self::Raw(raw) => KindleCookies::parse(&raw),
            Self::Structured(cookies) => {
                cookies.validate()?;
                Ok(cookies)
            }
        }
    }
}

impl std::fmt::Debug for CookieInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw(_) => f.write_str("Raw([REDACTED])"),
            Self::Structured(cookies) => f.debug_tuple("Structured").field(cookies).finish(),
        }
    }
}

impl From<KindleCookies> for CookieInput {
    fn from(cookies: KindleCookies) -> Self {
        Self::Structured(cookies)
    }
}

impl From<String> for CookieInput {
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}

impl From<&str> for CookieInput {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}
