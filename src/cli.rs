//! CLI argument definitions using clap derive macros.

use clap::{Parser, Subcommand};

use kindle_library::{OriginType, SortType};

/// List your Kindle library from the command line.
///
/// Reuses the cookies of a browser logged in to the Kindle web reader and
/// sends every request through a TLS-fingerprinting relay.
#[derive(Parser, Debug)]
#[command(name = "kindle-library")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Cookie header copied from a logged-in browser
    #[arg(long, env = "KINDLE_COOKIES", hide_env_values = true)]
    pub cookies: String,

    /// Device token of the web reader
    #[arg(long, env = "KINDLE_DEVICE_TOKEN", hide_env_values = true)]
    pub device_token: String,

    /// Regional web reader, e.g. https://lesen.amazon.de
    #[arg(long, env = "KINDLE_BASE_URL")]
    pub base_url: Option<String>,

    /// Book-detail client version
    #[arg(long, env = "KINDLE_CLIENT_VERSION")]
    pub client_version: Option<String>,

    /// Forwarding relay base URL
    #[arg(long, env = "TLS_SERVER_URL")]
    pub tls_server_url: String,

    /// Forwarding relay API key
    #[arg(long, env = "TLS_SERVER_API_KEY", hide_env_values = true)]
    pub tls_server_api_key: String,

    /// Deadline for one relay request in seconds (1-600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=600))]
    pub relay_timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List books, one per line: ASIN, title, authors
    Books {
        /// Sort order: recency, title, author, acquisition_desc, acquisition_asc
        #[arg(long)]
        sort: Option<SortType>,

        /// Restrict to KINDLE_UNLIMITED, PRIME or COMICS_UNLIMITED
        #[arg(long)]
        origin: Option<OriginType>,

        /// Books per listing page (1-1000)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=1000))]
        page_size: Option<u32>,

        /// Follow pagination until the last page
        #[arg(long)]
        all_pages: bool,
    },

    /// Print a book's details as JSON
    Details {
        /// ASIN of the book
        asin: String,

        /// Include metadata and reading percentage (one extra request)
        #[arg(long)]
        full: bool,
    },
}
