//! Relay mocks and web reader payloads shared by integration tests.

#![allow(dead_code)]

use std::net::TcpListener;

use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

use kindle_library::{KindleConfig, TlsServerConfig};

pub const API_KEY: &str = "test-key";
pub const COOKIES: &str = "at-main=a; session-id=2; ubid-main=3; x-main=4";
pub const DEVICE_TOKEN: &str = "device-token";
pub const ADP_TOKEN: &str = "adp-token";
pub const ASIN: &str = "B000FBJG4U";

pub const LISTING_URL: &str = "https://read.amazon.com/kindle-library/search?query=&libraryType=BOOKS&sortType=acquisition_desc&querySize=50";
pub const DEVICE_URL: &str = "https://read.amazon.com/service/web/register/getDeviceToken?serialNumber=device-token&deviceType=device-token";
pub const DETAILS_URL: &str = "https://read.amazon.com/service/mobile/reader/startReading?asin=B000FBJG4U&clientVersion=2000010";
pub const METADATA_URL: &str =
    "https://read.amazon.com/service/metadata/lookup?asin=B000FBJG4U&metadataVersion=1";
pub const SIGN_IN_URL: &str =
    "https://www.amazon.com/ap/signin?openid.pape.max_auth_age=1209600&openid.return_to=foobar";

/// Set to `1` to fail instead of skip when no mock relay can be bound.
pub const REQUIRE_RELAY_ENV: &str = "KINDLE_REQUIRE_SOCKET_TESTS";

/// Starts a mock relay, or returns `None` when localhost cannot be bound.
///
/// Panics instead of skipping when [`REQUIRE_RELAY_ENV`] is set.
#[track_caller]
pub fn start_relay_or_skip() -> impl Future<Output = Option<MockServer>> {
    let caller = std::panic::Location::caller();
    let bindable = TcpListener::bind("127.0.0.1:0").is_ok();
    async move {
        if bindable {
            return Some(MockServer::start().await);
        }
        let required = std::env::var(REQUIRE_RELAY_ENV)
            .is_ok_and(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true"));
        assert!(
            !required,
            "mock relay cannot bind localhost ({caller}) and {REQUIRE_RELAY_ENV} is set"
        );
        eprintln!("skipping relay test at {caller}: localhost cannot be bound");
        None
    }
}

/// Configuration pointing the relay at `server`.
pub fn config(server: &MockServer) -> KindleConfig {
    KindleConfig::new(
        COOKIES,
        DEVICE_TOKEN,
        TlsServerConfig::new(server.uri(), API_KEY),
    )
}

/// Relay mock for a forwarded GET of `url`.
pub fn forward_to(url: &str) -> MockBuilder {
    Mock::given(method("POST"))
        .and(path("/api/forward"))
        .and(header("x-api-key", API_KEY))
        .and(body_partial_json(json!({
            "tlsClientIdentifier": "chrome_112",
            "requestMethod": "GET",
            "requestUrl": url,
        })))
}

/// Relay answer carrying an upstream response.
pub fn forwarded(status: u16, body: impl Into<String>) -> Value {
    json!({
        "status": status,
        "headers": {},
        "cookies": {},
        "body": body.into(),
        "target": null,
    })
}

/// Relay answer whose upstream response set a `session-id` cookie.
pub fn forwarded_with_session(body: impl Into<String>, session_id: &str) -> Value {
    let mut value = forwarded(200, body);
    value["cookies"]["session-id"] = json!(session_id);
    value
}

/// Relay answer for an upstream redirect to the sign-in page.
pub fn sign_in_redirect() -> Value {
    let mut value = forwarded(302, "");
    value["headers"]["Location"] = json!([SIGN_IN_URL]);
    value
}

pub fn relay(value: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(value)
}

pub fn sample1_entry() -> Value {
    json!({
        "title": "Journey to the Center of the Earth",
        "asin": ASIN,
        "authors": ["Verne, Jules:"],
        "mangaOrComicAsin": false,
        "resourceType": "EBOOK",
        "originType": "PURCHASE",
        "percentageRead": 0,
        "productUrl": "https://m.media-amazon.com/images/I/41v+reLJm4L._SY346_.jpg",
        "webReaderUrl": "https://read.amazon.com/kp/kshare?asin=B000FBJG4U&id=wRj3DwAAQBAJ",
    })
}

pub fn entry(asin: &str) -> Value {
    let mut value = sample1_entry();
    value["asin"] = json!(asin);
    value["title"] = json!(format!("Book {asin}"));
    value
}

pub fn listing_body(entries: Vec<Value>, pagination_token: Option<&str>) -> String {
    let mut body = json!({ "itemsList": entries });
    if let Some(token) = pagination_token {
        body["paginationToken"] = json!(token);
    }
    body.to_string()
}

pub fn device_body() -> String {
    json!({
        "clientHashId": "hash",
        "deviceName": "Cloud Reader",
        "deviceSessionToken": ADP_TOKEN,
        "eid": "eid",
    })
    .to_string()
}

pub fn sample1_details_body() -> String {
    json!({
        "isOwned": true,
        "isSample": false,
        "formatVersion": "1.0",
        "lastPageReadData": {
            "deviceName": "Kindle Reader",
            "position": 0,
            "syncTime": 0,
        },
        "srl": 0,
        "metadataUrl": METADATA_URL,
    })
    .to_string()
}

pub fn sample1_metadata_body() -> String {
    let payload = json!({
        "startPosition": 1,
        "endPosition": 100,
        "releaseDate": "2009-04-01T00:00:00.000Z",
        "publisher": "Public Domain Books",
    });
    format!("({payload})")
}

/// Mounts the listing and device-token exchange of a successful bootstrap.
pub async fn mount_bootstrap(server: &MockServer, session_id: &str) {
    forward_to(LISTING_URL)
        .respond_with(relay(forwarded_with_session(
            listing_body(vec![sample1_entry()], None),
            session_id,
        )))
        .mount(server)
        .await;
    forward_to(DEVICE_URL)
        .respond_with(relay(forwarded(200, device_body())))
        .mount(server)
        .await;
}
