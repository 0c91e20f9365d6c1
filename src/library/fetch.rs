//! Listing pagination and catalog aggregation.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

use crate::auth::SESSION_ID_COOKIE;
use crate::book::{KindleBook, KindleBookData};
use crate::classify::check_response;
use crate::error::KindleError;
use crate::transport::HttpClient;

use super::query::{Filter, Query, listing_url};

/// Wire shape of one listing response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingResponse {
    #[serde(default)]
    items_list: Vec<KindleBookData>,
    #[serde(default)]
    pagination_token: Option<String>,
}

/// One page of the listing.
#[derive(Debug, Clone)]
pub struct Page {
    /// Raw entries in the order the web reader returned them.
    pub entries: Vec<KindleBookData>,
    /// Session id the response rotated to, if it set one.
    pub session_id: Option<String>,
    /// Continuation token; `None` on the last page.
    pub pagination_token: Option<String>,
}

/// Result of aggregating one or more listing pages.
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Book records across all fetched pages, in arrival order.
    pub books: Vec<KindleBook>,
    /// Most recently observed session id.
    pub session_id: Option<String>,
    /// Number of listing requests issued.
    pub pages: usize,
}

/// Fetches and decodes a single listing page.
///
/// # Errors
///
/// Returns [`KindleError::SessionExpired`] or
/// [`KindleError::UnexpectedResponse`] per response classification,
/// [`KindleError::Decode`] when the body is not listing JSON, and relay
/// errors unchanged.
#[instrument(level = "debug", skip(client), fields(url = %url))]
pub async fn fetch_page(client: &HttpClient, url: &str) -> Result<Page, KindleError> {
    let response = check_response(client.request(url).await?)?;

    let session_id = HttpClient::extract_set_cookies(&response)
        .remove(SESSION_ID_COOKIE)
        .filter(|id| !id.is_empty());

    let body: ListingResponse =
        serde_json::from_str(&response.body).map_err(|source| KindleError::decode(url, source))?;
    let pagination_token = body.pagination_token.filter(|token| !token.is_empty());

    debug!(
        entries = body.items_list.len(),
        rotated_session = session_id.is_some(),
        has_next_page = pagination_token.is_some(),
        "listing page fetched"
    );

    Ok(Page {
        entries: body.items_list,
        session_id,
        pagination_token,
    })
}

/// Fetches the listing and wraps every entry into a [`KindleBook`].
///
/// Only the first page is fetched unless the filter enables
/// `fetch_all_pages`, in which case pages are requested one after another
/// until a page carries no continuation token. A page without a `session-id`
/// cookie keeps the previously observed id.
///
/// # Errors
///
/// Returns the first page error unchanged; entries gathered before it are
/// discarded.
#[instrument(level = "debug", skip(client, query, filter), fields(base_url = %base_url))]
pub async fn aggregate(
    client: &Arc<HttpClient>,
    base_url: &Url,
    client_version: &str,
    query: &Query,
    filter: &Filter,
) -> Result<Catalog, KindleError> {
    let mut entries = Vec::new();
    let mut session_id = None;
    let mut pagination_token: Option<String> = None;
    let mut pages = 0_usize;

    loop {
        let url = listing_url(base_url, query, filter, pagination_token.as_deref())?;
        let page = fetch_page(client, &url).await?;
        pages += 1;

        if page.session_id.is_some() {
            session_id = page.session_id;
        }
        entries.extend(page.entries);
        pagination_token = page.pagination_token;

        if pagination_token.is_none() || !filter.fetch_all_pages() {
            break;
        }
    }

    info!(books = entries.len(), pages, "library listing fetched");

    let books = entries
        .into_iter()
        .map(|data| KindleBook::new(data, Arc::clone(client), base_url, client_version))
        .collect();

    Ok(Catalog {
        books,
        session_id,
        pages,
    })
}
