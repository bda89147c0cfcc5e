//! Content module - post models and the listing/detail flows

mod detail;
mod listing;
mod post;
mod reading;

pub use detail::DetailState;
pub use listing::ListingState;
pub use post::{PostDetail, PostSummary, Section};
pub use reading::{count_words, reading_time, total_words};
