//! Transport adapter for the Kindle web reader.
//!
//! The web reader is never contacted directly. Every request is handed to a
//! TLS-fingerprinting forwarding relay:
//!
//! - [`ForwardTransport`] - Async trait for the relay exchange
//! - [`TlsRelayClient`] - Default relay client over `reqwest`
//! - [`HttpClient`] - Session-aware adapter adding cookies, browser headers
//!   and session tokens to every request
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use kindle_library::auth::KindleCookies;
//! use kindle_library::transport::{HttpClient, TlsRelayClient, TlsServerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let relay = TlsRelayClient::new(&TlsServerConfig::new("http://localhost:8080", "api-key"))?;
//! let client = HttpClient::new(KindleCookies::parse("at-main=a; session-id=2; ubid-main=3; x-main=4")?, Arc::new(relay));
//! let response = client.request("https://read.amazon.com/kindle-library").await?;
//! println!("status: {}", response.status);
//! # Ok(())
//! # }
//! ```

mod client;
mod relay;

pub use client::{ADP_SESSION_HEADER, HttpClient, SESSION_ID_HEADER, SessionState};
pub use relay::{
    ForwardRequest, ForwardResponse, ForwardTransport, TLS_CLIENT_IDENTIFIER, TlsRelayClient,
    TlsServerConfig,
};
