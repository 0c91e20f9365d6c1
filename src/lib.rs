//! Kindle Library Client
//!
//! This library talks to the Kindle web reader's undocumented API using the
//! cookies of a logged-in browser, and exposes the user's e-book catalog with
//! on-demand details and reading progress.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`auth`] - Browser cookie parsing and validation
//! - [`transport`] - Forwarding relay client and the session-aware adapter
//! - [`classify`] - Sign-in redirect and status classification
//! - [`library`] - Listing parameters and pagination
//! - [`book`] - Book records, author normalization and lazy details
//! - [`kindle`] - Session bootstrap and the catalog handle
//!
//! # Example
//!
//! ```no_run
//! use kindle_library::{Filter, Kindle, KindleConfig, Query, TlsServerConfig};
//!
//! # async fn example() -> Result<(), kindle_library::KindleError> {
//! let config = KindleConfig::new(
//!     "at-main=...; session-id=...; ubid-main=...; x-main=...",
//!     "device-token",
//!     TlsServerConfig::new("http://localhost:8080", "api-key"),
//! );
//! let mut kindle = Kindle::from_config(config).await?;
//! let books = kindle
//!     .books(&Query::default(), &Filter::default().with_fetch_all_pages(true))
//!     .await?;
//! let details = books[0].full_details(None).await?;
//! println!("{} is {}% read", details.details.title, details.percentage_read);
//! # Ok(())
//! # }
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod book;
pub mod classify;
pub mod error;
pub mod kindle;
pub mod library;
pub mod transport;
pub mod user_agent;

mod utils;

// Re-export commonly used types
pub use auth::{CookieError, CookieInput, KindleCookies};
pub use book::{
    BookType, FullDetails, KindleAuthor, KindleBook, KindleBookData, LightDetails,
    ReadingProgress,
};
pub use classify::{check_response, is_ok, is_sign_in_redirect};
pub use error::{ErrorKind, KindleError};
pub use kindle::{DeviceInfo, Kindle, KindleConfig};
pub use library::{Filter, OriginType, Query, SortType};
pub use transport::{
    ForwardRequest, ForwardResponse, ForwardTransport, HttpClient, TlsRelayClient,
    TlsServerConfig,
};
