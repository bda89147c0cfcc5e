//! Listing state for the paginated post index

use indexmap::IndexMap;

use super::PostSummary;
use crate::cms::{ApiPage, ContentError, ContentSource, Cursor};

/// Loaded post summaries plus the cursor to the next page
///
/// Entries keep API order and are keyed by slug, so a page that overlaps
/// what is already loaded cannot introduce duplicates. States are never
/// mutated in place: [`append`](Self::append) and
/// [`load_more`](Self::load_more) return a new state and leave `self`
/// untouched, including on failure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingState {
    posts: IndexMap<String, PostSummary>,
    next_page: Option<Cursor>,
}

impl ListingState {
    /// Fetch the first page of the listing
    pub async fn initial<S>(source: &S, page_size: usize) -> Result<Self, ContentError>
    where
        S: ContentSource + ?Sized,
    {
        let page = source.first_page(page_size).await?;
        Self::default().append(page)
    }

    /// An empty listing that continues from `cursor`
    pub fn from_cursor(cursor: Cursor) -> Self {
        Self {
            posts: IndexMap::new(),
            next_page: Some(cursor),
        }
    }

    /// Append a fetched page after the existing entries
    ///
    /// The cursor is replaced by the page's `next_page`, including `None`.
    /// Summaries whose slug is already listed are skipped.
    pub fn append(&self, page: ApiPage) -> Result<Self, ContentError> {
        let incoming = page
            .results
            .iter()
            .map(PostSummary::from_document)
            .collect::<Result<Vec<_>, _>>()?;

        let mut posts = self.posts.clone();
        for summary in incoming {
            if posts.contains_key(&summary.uid) {
                tracing::debug!("Skipping duplicate post {}", summary.uid);
                continue;
            }
            posts.insert(summary.uid.clone(), summary);
        }

        Ok(Self {
            posts,
            next_page: page.next_page,
        })
    }

    /// Fetch the page behind the current cursor and append it
    pub async fn load_more<S>(&self, source: &S) -> Result<Self, ContentError>
    where
        S: ContentSource + ?Sized,
    {
        let cursor = self.next_page.as_ref().ok_or(ContentError::ListingExhausted)?;
        let page = source.follow(cursor).await?;
        self.append(page)
    }

    /// Follow the cursor chain until the last page
    pub async fn load_all<S>(self, source: &S) -> Result<Self, ContentError>
    where
        S: ContentSource + ?Sized,
    {
        let mut state = self;
        while state.can_load_more() {
            state = state.load_more(source).await?;
        }
        Ok(state)
    }

    pub fn posts(&self) -> impl Iterator<Item = &PostSummary> {
        self.posts.values()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn next_page(&self) -> Option<&Cursor> {
        self.next_page.as_ref()
    }

    /// Whether the "load more" control should be offered
    pub fn can_load_more(&self) -> bool {
        self.next_page.is_some()
    }
}
