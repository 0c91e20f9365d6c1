//! Library listing: query parameters and pagination.

mod fetch;
mod query;

pub use fetch::{Catalog, Page, aggregate, fetch_page};
pub use query::{
    DEFAULT_QUERY_SIZE, Filter, LIBRARY_SEARCH_PATH, OriginType, ParseParameterError, Query,
    SortType, listing_url,
};
