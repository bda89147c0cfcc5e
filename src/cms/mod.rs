//! Content client for the headless CMS
//!
//! [`ContentSource`] is the seam between the site and the content API.
//! [`PrismicClient`] talks to a Prismic-compatible REST API; tests use an
//! in-memory source.

mod client;
mod document;
#[cfg(test)]
pub(crate) mod memory;

pub use client::PrismicClient;
pub use document::{ApiPage, BlockKind, Cursor, Document, RichTextBlock, Span, SpanKind};

use async_trait::async_trait;

/// Errors surfaced by the content client and the flows built on it
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("no document with uid {0:?}")]
    NotFound(String),

    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("cursor does not point at the content API: {0}")]
    InvalidCursor(String),

    #[error("listing has no next page")]
    ListingExhausted,
}

impl ContentError {
    /// Whether retrying the same request later could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
            || matches!(self, Self::Status { status, .. } if *status >= 500)
    }
}

/// A paginated source of post documents
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// First page of the post listing
    async fn first_page(&self, page_size: usize) -> Result<ApiPage, ContentError>;

    /// Page referenced by a cursor from a previous page
    async fn follow(&self, cursor: &Cursor) -> Result<ApiPage, ContentError>;

    /// A single post by its unique identifier; `None` if there is none
    async fn by_uid(&self, uid: &str) -> Result<Option<Document>, ContentError>;
}
