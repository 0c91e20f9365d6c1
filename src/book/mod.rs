//! Book records and their lazily resolved details.

mod authors;
mod details;
mod record;

pub use authors::{KindleAuthor, normalize_authors, to_large_image};
pub use details::{
    BookType, FullDetails, LightDetails, ReadingProgress, START_READING_PATH, details_url,
    percentage_read,
};
pub use record::{KindleBook, KindleBookData};
