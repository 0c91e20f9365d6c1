//! Response classification for web reader calls.
//!
//! The web reader signals an expired cookie session by redirecting to the
//! Amazon sign-in page rather than with 401. That redirect is itself outside
//! 2xx, so [`check_response`] must test for it before the generic status check.

use tracing::debug;
use url::Url;

use crate::error::KindleError;
use crate::transport::ForwardResponse;

/// Path prefix of the Amazon sign-in page.
pub const SIGN_IN_PATH: &str = "/ap/signin";

const REDIRECT_FOUND: u16 = 302;

/// Returns true if the response is a 302 redirect to the Amazon sign-in page.
///
/// The first `Location` value must be an `https` URL on an Amazon storefront
/// host (`www.amazon.com`, `www.amazon.de`, ...) whose path starts with
/// [`SIGN_IN_PATH`].
#[must_use]
pub fn is_sign_in_redirect(response: &ForwardResponse) -> bool {
    if response.status != REDIRECT_FOUND {
        return false;
    }
    response
        .header_values("Location")
        .first()
        .is_some_and(|location| is_sign_in_url(location))
}

/// Returns true if the status is within 200..=299.
#[must_use]
pub fn is_ok(response: &ForwardResponse) -> bool {
    (200..=299).contains(&response.status)
}

/// Classifies a completed response.
///
/// # Errors
///
/// Returns [`KindleError::SessionExpired`] for a sign-in redirect, otherwise
/// [`KindleError::UnexpectedResponse`] for any status outside 2xx.
pub fn check_response(response: ForwardResponse) -> Result<ForwardResponse, KindleError> {
    if is_sign_in_redirect(&response) {
        let location = response
            .header_values("Location")
            .first()
            .cloned()
            .unwrap_or_default();
        debug!(status = response.status, "sign-in redirect detected");
        return Err(KindleError::session_expired(location, response));
    }
    if !is_ok(&response) {
        debug!(status = response.status, "unexpected response status");
        return Err(KindleError::unexpected_status(response));
    }
    Ok(response)
}

fn is_sign_in_url(location: &str) -> bool {
    let Ok(url) = Url::parse(location) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    let storefront = host.strip_prefix("www.").unwrap_or(host);
    url.scheme() == "https"
        && storefront
            .strip_prefix("amazon.")
            .is_some_and(is_storefront_suffix)
        && url.path().starts_with(SIGN_IN_PATH)
}

// `com`, `de`, `co.uk`, `com.au`: one or two short alphabetic labels.
fn is_storefront_suffix(suffix: &str) -> bool {
    let labels: Vec<&str> = suffix.split('.').collect();
    (1..=2).contains(&labels.len())
        && labels.iter().all(|label| {
            (2..=3).contains(&label.len()) && label.chars().all(|c| c.is_ascii_alphabetic())
        })
}
