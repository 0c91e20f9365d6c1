//! Book records built from listing entries.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::classify::check_response;
use crate::error::KindleError;
use crate::transport::HttpClient;

use super::authors::{KindleAuthor, normalize_authors, to_large_image};
use super::details::{
    BookMetadata, BookType, FullDetails, LastPageRead, LightDetails, StartReadingResponse,
    details_url, percentage_read,
};

/// One entry of the listing as the web reader returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindleBookData {
    /// Book title.
    pub title: String,
    /// Amazon Standard Identification Number.
    pub asin: String,
    /// Colon-joined author string, normally a single element.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Whether the ASIN belongs to a manga or comic.
    #[serde(default)]
    pub manga_or_comic_asin: bool,
    /// Content type, e.g. `EBOOK`.
    #[serde(default)]
    pub resource_type: Option<String>,
    /// How the book entered the library, e.g. `PURCHASE`.
    #[serde(default)]
    pub origin_type: String,
    /// Always 0 in listing responses.
    #[serde(default)]
    pub percentage_read: f64,
    /// Cover image URL despite the name.
    #[serde(default)]
    pub product_url: String,
    /// Link opening the book in the web reader.
    #[serde(default)]
    pub web_reader_url: String,
}

/// A book in the library with lazily resolved details.
///
/// Records share the catalog's [`HttpClient`], so detail calls use whatever
/// session tokens the client holds at call time. Details are fetched again on
/// every call.
#[derive(Debug, Clone)]
pub struct KindleBook {
    /// Book title.
    pub title: String,
    /// Amazon Standard Identification Number.
    pub asin: String,
    /// Normalized author names.
    pub authors: Vec<KindleAuthor>,
    /// Cover image URL.
    pub image_url: String,
    /// How the book entered the library, e.g. `PURCHASE`.
    pub origin_type: String,
    /// Content type, e.g. `EBOOK`.
    pub resource_type: Option<String>,
    /// Cover image URL under its listing field name.
    pub product_url: String,
    /// Whether the ASIN belongs to a manga or comic.
    pub manga_or_comic_asin: bool,
    /// Link opening the book in the web reader.
    pub web_reader_url: String,

    client: Arc<HttpClient>,
    base_url: Url,
    client_version: String,
}

impl KindleBook {
    /// Wraps a listing entry.
    #[must_use]
    pub fn new(
        data: KindleBookData,
        client: Arc<HttpClient>,
        base_url: &Url,
        client_version: &str,
    ) -> Self {
        Self {
            authors: normalize_authors(&data.authors),
            image_url: data.product_url.clone(),
            title: data.title,
            asin: data.asin,
            origin_type: data.origin_type,
            resource_type: data.resource_type,
            product_url: data.product_url,
            manga_or_comic_asin: data.manga_or_comic_asin,
            web_reader_url: data.web_reader_url,
            client,
            base_url: base_url.clone(),
            client_version: client_version.to_string(),
        }
    }

    /// Fetches ownership, format and reading progress with one request.
    ///
    /// # Errors
    ///
    /// Returns a classified error for sign-in redirects and non-2xx
    /// responses, and [`KindleError::Decode`] when the body is not the
    /// expected JSON.
    #[instrument(level = "debug", skip(self), fields(asin = %self.asin))]
    pub async fn details(&self) -> Result<LightDetails, KindleError> {
        let url = details_url(&self.base_url, &self.asin, &self.client_version)?;
        let response = check_response(self.client.request(&url).await?)?;
        let info: StartReadingResponse = serde_json::from_str(&response.body)
            .map_err(|source| KindleError::decode(&url, source))?;

        debug!(
            is_owned = info.is_owned,
            is_sample = info.is_sample,
            has_progress = info.last_page_read_data.is_some(),
            "book details fetched"
        );

        Ok(LightDetails {
            title: self.title.clone(),
            asin: self.asin.clone(),
            authors: self.authors.clone(),
            book_type: BookType::from_flags(info.is_owned, info.is_sample),
            format_version: info.format_version,
            manga_or_comic_asin: self.manga_or_comic_asin,
            origin_type: self.origin_type.clone(),
            product_url: self.product_url.clone(),
            cover_url: self.product_url.clone(),
            large_cover_url: to_large_image(&self.product_url),
            web_reader_url: self.web_reader_url.clone(),
            srl: info.srl,
            metadata_url: info.metadata_url,
            progress: info.last_page_read_data.map(LastPageRead::into_progress),
        })
    }

    /// Resolves light details (unless given) and the metadata lookup.
    ///
    /// Issues two requests when `details` is `None`, one otherwise.
    ///
    /// # Errors
    ///
    /// Returns any [`details`](Self::details) error, a classified error for
    /// the metadata response, and [`KindleError::MalformedMetadata`] when
    /// its body carries no callback-wrapped JSON.
    #[instrument(level = "debug", skip(self, details), fields(asin = %self.asin))]
    pub async fn full_details(
        &self,
        details: Option<LightDetails>,
    ) -> Result<FullDetails, KindleError> {
        let details = match details {
            Some(details) => details,
            None => self.details().await?,
        };

        let response = check_response(self.client.request(&details.metadata_url).await?)?;
        let metadata: BookMetadata = HttpClient::parse_encoded_body(&response)
            .ok_or_else(|| KindleError::malformed_metadata(&details.metadata_url))?;

        let start_position = metadata.start_position.unwrap_or(0);
        let position = details.progress.as_ref().map_or(0, |progress| progress.position);
        let percentage_read = percentage_read(start_position, position, metadata.end_position);

        debug!(
            start_position,
            end_position = metadata.end_position,
            percentage_read,
            "book metadata fetched"
        );

        Ok(FullDetails {
            details,
            publisher: metadata.publisher,
            release_date: metadata.release_date,
            start_position,
            end_position: metadata.end_position,
            percentage_read,
        })
    }
}
