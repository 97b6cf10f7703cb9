// Course catalogue crawling: listing page → detail pages → summaries.

pub mod checkpoint;
pub mod html;
pub mod listing;
pub mod page;
pub mod rate_limiter;
pub mod summarizer;

pub use checkpoint::{Checkpoint, CheckpointEntry};
pub use listing::{parse_listing, ListingEntry};
pub use page::{PageClient, PageSource};
pub use summarizer::{ChatSummarizer, ExcerptSummarizer, Summarizer};
