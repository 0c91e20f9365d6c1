//! CLI entry point for the Kindle library client.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use kindle_library::{
    Filter, Kindle, KindleAuthor, KindleBook, KindleConfig, Query, TlsServerConfig,
};
use tracing::{debug, info};

mod cli;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (warn)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(command = ?args.command, "CLI arguments parsed");

    let mut kindle = Kindle::from_config(build_config(&args))
        .await
        .context("failed to establish a Kindle session")?;
    info!(
        books = kindle.default_books().len(),
        "Kindle session established"
    );

    match args.command {
        Command::Books {
            sort,
            origin,
            page_size,
            all_pages,
        } => {
            let query = Query { sort_type: sort };
            let filter = Filter {
                query_size: page_size,
                origin_type: origin,
                fetch_all_pages: Some(all_pages),
            };
            // The bootstrap listing already used the defaults.
            let defaults = Filter::default().with_fetch_all_pages(false);
            let books = if query == Query::default() && filter == defaults {
                kindle.default_books().to_vec()
            } else {
                kindle.books(&query, &filter).await?
            };
            for book in &books {
                println!("{}", book_line(book));
            }
            info!(count = books.len(), "Listed books");
        }
        Command::Details { asin, full } => {
            let book = find_book(&mut kindle, &asin).await?;
            let json = if full {
                serde_json::to_string_pretty(&book.full_details(None).await?)?
            } else {
                serde_json::to_string_pretty(&book.details().await?)?
            };
            println!("{json}");
        }
    }

    Ok(())
}

fn build_config(args: &Args) -> KindleConfig {
    let mut tls_server = TlsServerConfig::new(&args.tls_server_url, &args.tls_server_api_key);
    if let Some(seconds) = args.relay_timeout {
        tls_server = tls_server.with_timeout(Duration::from_secs(seconds));
    }

    let mut config = KindleConfig::new(args.cookies.as_str(), &args.device_token, tls_server);
    if let Some(base_url) = &args.base_url {
        config = config.with_base_url(base_url);
    }
    if let Some(version) = &args.client_version {
        config = config.with_client_version(version);
    }
    config
}

/// Looks in the default list first, then walks every page.
async fn find_book(kindle: &mut Kindle, asin: &str) -> Result<KindleBook> {
    if let Some(book) = kindle.find_default_book(asin) {
        return Ok(book.clone());
    }
    debug!(asin, "book not in default list, fetching all pages");
    let books = kindle
        .books(&Query::default(), &Filter::default().with_fetch_all_pages(true))
        .await?;
    books
        .into_iter()
        .find(|book| book.asin == asin)
        .with_context(|| format!("book {asin} not found in library"))
}

fn book_line(book: &KindleBook) -> String {
    format!(
        "{}\t{}\t{}",
        book.asin,
        book.title,
        format_authors(&book.authors)
    )
}

fn format_authors(authors: &[KindleAuthor]) -> String {
    authors
        .iter()
        .map(|author| {
            if author.last_name.is_empty() {
                author.first_name.clone()
            } else {
                format!("{} {}", author.first_name, author.last_name)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
