//! Listing query and filter parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::KindleError;

/// Listing endpoint path below the base URL.
pub const LIBRARY_SEARCH_PATH: &str = "kindle-library/search";

/// Default page size of the listing endpoint.
pub const DEFAULT_QUERY_SIZE: u32 = 50;

/// Sort order of the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortType {
    /// Most recently opened first.
    Recency,
    /// Alphabetical by title.
    Title,
    /// Alphabetical by author.
    Author,
    /// Newest acquisition first.
    #[default]
    AcquisitionDesc,
    /// Oldest acquisition first.
    AcquisitionAsc,
}

impl SortType {
    /// Wire value of the `sortType` parameter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recency => "recency",
            Self::Title => "title",
            Self::Author => "author",
            Self::AcquisitionDesc => "acquisition_desc",
            Self::AcquisitionAsc => "acquisition_asc",
        }
    }
}

impl fmt::Display for SortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortType {
    type Err = ParseParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recency" => Ok(Self::Recency),
            "title" => Ok(Self::Title),
            "author" => Ok(Self::Author),
            "acquisition_desc" => Ok(Self::AcquisitionDesc),
            "acquisition_asc" => Ok(Self::AcquisitionAsc),
            _ => Err(ParseParameterError::new("sortType", s)),
        }
    }
}

/// Subscription the listing is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OriginType {
    /// Kindle Unlimited loans.
    KindleUnlimited,
    /// Prime Reading loans.
    Prime,
    /// Comics Unlimited loans.
    ComicsUnlimited,
}

impl OriginType {
    /// Wire value of the `originType` parameter.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::KindleUnlimited => "KINDLE_UNLIMITED",
            Self::Prime => "PRIME",
            Self::ComicsUnlimited => "COMICS_UNLIMITED",
        }
    }
}

impl fmt::Display for OriginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OriginType {
    type Err = ParseParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "KINDLE_UNLIMITED" => Ok(Self::KindleUnlimited),
            "PRIME" => Ok(Self::Prime),
            "COMICS_UNLIMITED" => Ok(Self::ComicsUnlimited),
            _ => Err(ParseParameterError::new("originType", s)),
        }
    }
}

/// Unknown listing parameter value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {parameter} value '{value}'")]
pub struct ParseParameterError {
    parameter: &'static str,
    value: String,
}

impl ParseParameterError {
    fn new(parameter: &'static str, value: &str) -> Self {
        Self {
            parameter,
            value: value.to_string(),
        }
    }
}

/// Listing order. Unset fields fall back to the defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Query {
    /// Sort order, default [`SortType::AcquisitionDesc`].
    pub sort_type: Option<SortType>,
}

impl Query {
    /// Query with an explicit sort order.
    #[must_use]
    pub fn sorted_by(sort_type: SortType) -> Self {
        Self {
            sort_type: Some(sort_type),
        }
    }

    /// Effective sort order.
    #[must_use]
    pub fn sort_type(&self) -> SortType {
        self.sort_type.unwrap_or_default()
    }
}

/// Listing filter. Unset fields fall back to the defaults.
///
/// The pagination token is deliberately not part of the filter: it is only
/// ever threaded between pages by the aggregator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Filter {
    /// Page size, default [`DEFAULT_QUERY_SIZE`].
    pub query_size: Option<u32>,
    /// Restrict to one subscription.
    pub origin_type: Option<OriginType>,
    /// Follow pagination tokens until the last page, default `false`.
    pub fetch_all_pages: Option<bool>,
}

impl Filter {
    /// Sets the page size.
    #[must_use]
    pub fn with_query_size(mut self, query_size: u32) -> Self {
        self.query_size = Some(query_size);
        self
    }

    /// Restricts the listing to one subscription.
    #[must_use]
    pub fn with_origin_type(mut self, origin_type: OriginType) -> Self {
        self.origin_type = Some(origin_type);
        self
    }

    /// Enables or disables automatic pagination.
    #[must_use]
    pub fn with_fetch_all_pages(mut self, fetch_all_pages: bool) -> Self {
        self.fetch_all_pages = Some(fetch_all_pages);
        self
    }

    /// Effective page size.
    #[must_use]
    pub fn query_size(&self) -> u32 {
        self.query_size.unwrap_or(DEFAULT_QUERY_SIZE)
    }

    /// Whether every page should be fetched.
    #[must_use]
    pub fn fetch_all_pages(&self) -> bool {
        self.fetch_all_pages.unwrap_or(false)
    }
}

/// Builds the listing URL for one page.
///
/// `fetch_all_pages` never reaches the URL; it only steers the aggregator.
///
/// # Errors
///
/// Returns [`KindleError::Configuration`] when `base_url` cannot be joined
/// with the listing path.
pub fn listing_url(
    base_url: &Url,
    query: &Query,
    filter: &Filter,
    pagination_token: Option<&str>,
) -> Result<String, KindleError> {
    let mut url = base_url.join(LIBRARY_SEARCH_PATH).map_err(|error| {
        KindleError::configuration(format!("invalid base URL '{base_url}': {error}"))
    })?;
    {
        let mut params = url.query_pairs_mut();
        params
            .append_pair("query", "")
            .append_pair("libraryType", "BOOKS")
            .append_pair("sortType", query.sort_type().as_str())
            .append_pair("querySize", &filter.query_size().to_string());
        if let Some(origin_type) = filter.origin_type {
            params.append_pair("originType", origin_type.as_str());
        }
        if let Some(token) = pagination_token {
            params.append_pair("paginationToken", token);
        }
    }
    Ok(url.into())
}
