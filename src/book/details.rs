//! Detail projections resolved lazily per book.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::KindleError;

use super::authors::KindleAuthor;

/// Book-detail endpoint path below the base URL.
pub const START_READING_PATH: &str = "service/mobile/reader/startReading";

/// Ownership state reported by the book-detail endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookType {
    /// Purchased or borrowed.
    Owned,
    /// Free sample.
    Sample,
    /// Neither flag set.
    Unknown,
}

impl BookType {
    /// `Sample` wins over `Owned`.
    #[must_use]
    pub fn from_flags(is_owned: bool, is_sample: bool) -> Self {
        if is_sample {
            Self::Sample
        } else if is_owned {
            Self::Owned
        } else {
            Self::Unknown
        }
    }
}

/// Last reading position synced by any device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingProgress {
    /// Name of the device that synced the position.
    pub reported_on_device: String,
    /// Last read location.
    pub position: i64,
    /// When the position was synced.
    pub sync_date: DateTime<Utc>,
}

/// Details available from a single book-detail call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightDetails {
    /// Book title.
    pub title: String,
    /// Amazon Standard Identification Number.
    pub asin: String,
    /// Normalized author names.
    pub authors: Vec<KindleAuthor>,
    /// Ownership state.
    pub book_type: BookType,
    /// Content format version.
    pub format_version: String,
    /// Whether the ASIN belongs to a manga or comic.
    pub manga_or_comic_asin: bool,
    /// How the book entered the library, e.g. `PURCHASE`.
    pub origin_type: String,
    /// Same as `cover_url`; kept for callers that read the listing field name.
    pub product_url: String,
    /// Heavily compressed cover image.
    pub cover_url: String,
    /// Cover image without the sizing hint.
    pub large_cover_url: String,
    /// Link opening the book in the web reader.
    pub web_reader_url: String,
    /// Start reading location.
    pub srl: i64,
    /// URL of the callback-wrapped metadata lookup.
    pub metadata_url: String,
    /// `None` when the book has never been opened on any device.
    pub progress: Option<ReadingProgress>,
}

/// Light details plus metadata and reading percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullDetails {
    /// Details the metadata lookup was resolved from.
    #[serde(flatten)]
    pub details: LightDetails,
    /// Publisher, when the lookup reports one.
    pub publisher: Option<String>,
    /// Release date as reported, unparsed.
    pub release_date: String,
    /// First readable location; 0 when unreported.
    pub start_position: i64,
    /// Last readable location.
    pub end_position: i64,
    /// Reading progress in percent, one decimal.
    pub percentage_read: f64,
}

/// Wire shape of the book-detail response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StartReadingResponse {
    #[serde(default)]
    pub is_owned: bool,
    #[serde(default)]
    pub is_sample: bool,
    #[serde(default)]
    pub format_version: String,
    #[serde(default)]
    pub last_page_read_data: Option<LastPageRead>,
    #[serde(default)]
    pub srl: i64,
    pub metadata_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LastPageRead {
    #[serde(default)]
    pub device_name: String,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub sync_time: i64,
}

impl LastPageRead {
    pub(crate) fn into_progress(self) -> ReadingProgress {
        ReadingProgress {
            reported_on_device: self.device_name,
            position: self.position,
            // Out-of-range timestamps collapse to the epoch.
            sync_date: DateTime::from_timestamp_millis(self.sync_time).unwrap_or_default(),
        }
    }
}

/// Wire shape of the unwrapped metadata lookup payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BookMetadata {
    #[serde(default)]
    pub start_position: Option<i64>,
    #[serde(default)]
    pub end_position: i64,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub publisher: Option<String>,
}

/// Builds the book-detail URL for `asin`.
///
/// # Errors
///
/// Returns [`KindleError::Configuration`] when `base_url` cannot be joined.
pub fn details_url(base_url: &Url, asin: &str, client_version: &str) -> Result<String, KindleError> {
    let mut url = base_url.join(START_READING_PATH).map_err(|error| {
        KindleError::configuration(format!("invalid base URL '{base_url}': {error}"))
    })?;
    url.query_pairs_mut()
        .append_pair("asin", asin)
        .append_pair("clientVersion", client_version);
    Ok(url.into())
}

/// Reading percentage with the ratio rounded to three decimals first.
///
/// `(start + position) / end` is rounded half-up to a multiple of 0.001 and
/// then scaled to a percentage, so `0.9955` becomes `99.6` and `0.9996`
/// becomes `100.0`. The ratio is computed on integers to keep decimal
/// boundaries exact. A non-positive `end` yields `0.0`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percentage_read(start_position: i64, position: i64, end_position: i64) -> f64 {
    if end_position <= 0 {
        return 0.0;
    }
    let read = i128::from(start_position) + i128::from(position);
    let end = i128::from(end_position);
    let permille = (read * 2000 + end).div_euclid(2 * end);
    permille as f64 / 10.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_simple() {
        assert_eq!(percentage_read(1, 0, 100), 1.0);
    }

    #[test]
    fn test_percentage_rounds_ratio_not_percentage() {
        // 1991 / 2000 = 0.9955
        assert_eq!(percentage_read(1, 1990, 2000), 99.6);
        // 9996 / 10000 = 0.9996
        assert_eq!(percentage_read(1, 9995, 10_000), 100.0);
        // 1 / 3 = 0.333...
        assert_eq!(percentage_read(0, 1, 3), 33.3);
    }

    #[test]
    fn test_percentage_zero_end_position() {
        assert_eq!(percentage_read(1, 5, 0), 0.0);
    }

    #[test]
    fn test_book_type_precedence() {
        assert_eq!(BookType::from_flags(true, true), BookType::Sample);
        assert_eq!(BookType::from_flags(true, false), BookType::Owned);
        assert_eq!(BookType::from_flags(false, false), BookType::Unknown);
    }

    #[test]
    fn test_details_url() {
        let base = Url::parse("https://read.amazon.com").unwrap();
        assert_eq!(
            details_url(&base, "B000FBJG4U", "2000010").unwrap(),
            "https://read.amazon.com/service/mobile/reader/startReading?asin=B000FBJG4U&clientVersion=2000010"
        );
    }

    #[test]
    fn test_sync_time_is_epoch_millis() {
        let progress = LastPageRead {
            device_name: "Kindle Reader".to_string(),
            position: 42,
            sync_time: 1_700_000_000_123,
        }
        .into_progress();
        assert_eq!(progress.sync_date.timestamp_millis(), 1_700_000_000_123);
        assert_eq!(progress.position, 42);
    }

    #[test]
    fn test_full_details_serializes_flat() {
        let light = LightDetails {
            title: "T".to_string(),
            asin: "A".to_string(),
            authors: Vec::new(),
            book_type: BookType::Owned,
            format_version: "1.0".to_string(),
            manga_or_comic_asin: false,
            origin_type: "PURCHASE".to_string(),
            product_url: "p".to_string(),
            cover_url: "p".to_string(),
            large_cover_url: "p".to_string(),
            web_reader_url: "w".to_string(),
            srl: 0,
            metadata_url: "m".to_string(),
            progress: None,
        };
        let full = FullDetails {
            details: light,
            publisher: Some("Public Domain Books".to_string()),
            release_date: "2009-04-01T00:00:00.000Z".to_string(),
            start_position: 1,
            end_position: 100,
            percentage_read: 1.0,
        };
        let value = serde_json::to_value(&full).unwrap();
        assert_eq!(value["bookType"], "owned");
        assert_eq!(value["asin"], "A");
        assert_eq!(value["percentageRead"], 1.0);
        assert!(value.get("details").is_none());
    }
}
