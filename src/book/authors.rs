//! Author and cover-image normalization.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::utils::compile_static_regex;

/// `._SY346_`-style sizing hint in cover image URLs.
static IMAGE_SIZE_HINT_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"\._SY\d+_"));

/// A normalized author name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindleAuthor {
    /// Given and middle names.
    pub first_name: String,
    /// Family name, empty for single-name authors.
    pub last_name: String,
}

/// Normalizes the listing's author field into structured names.
///
/// Only the first raw string is used; the web reader joins every author into
/// one `Last, First:Last, First:` field. Empty segments are dropped and exact
/// duplicates removed, keeping first-occurrence order.
///
/// ```
/// use kindle_library::book::normalize_authors;
///
/// let authors = normalize_authors(&["Thorensen, Olan:Maddox:".to_string()]);
/// assert_eq!(authors[0].first_name, "Olan");
/// assert_eq!(authors[0].last_name, "Thorensen");
/// assert_eq!(authors[1].first_name, "Maddox");
/// assert_eq!(authors[1].last_name, "");
/// ```
#[must_use]
pub fn normalize_authors(raw_authors: &[String]) -> Vec<KindleAuthor> {
    let Some(raw) = raw_authors.first() else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    raw.split(':')
        .filter(|segment| !segment.is_empty())
        .filter(|segment| seen.insert(*segment))
        .map(author_from_segment)
        .collect()
}

fn author_from_segment(segment: &str) -> KindleAuthor {
    let mut parts = segment.split(',').map(str::trim);
    let before_comma = parts.next().unwrap_or_default();
    let after_comma = parts.next().unwrap_or_default();

    if after_comma.is_empty() {
        KindleAuthor {
            first_name: before_comma.to_string(),
            last_name: String::new(),
        }
    } else {
        KindleAuthor {
            first_name: after_comma.to_string(),
            last_name: before_comma.to_string(),
        }
    }
}

/// Strips the `._SY<digits>_` sizing hint from a cover image URL.
///
/// Idempotent: URLs without the hint are returned unchanged.
#[must_use]
pub fn to_large_image(url: &str) -> String {
    IMAGE_SIZE_HINT_RE.replace_all(url, "").into_owned()
}
