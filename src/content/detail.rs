//! Single post resolution

use super::PostDetail;
use crate::cms::{ContentError, ContentSource};

/// Where a post page is in its resolution
#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    /// Resolution in flight; render a placeholder
    Loading,
    Ready(Box<PostDetail>),
    /// Terminal: the CMS has no post with this slug
    NotFound { slug: String },
}

impl DetailState {
    /// Resolve a slug against the content source
    ///
    /// Yields `Ready` or `NotFound`; network and payload errors propagate.
    pub async fn resolve<S>(source: &S, slug: &str) -> Result<Self, ContentError>
    where
        S: ContentSource + ?Sized,
    {
        match source.by_uid(slug).await {
            Ok(Some(doc)) => Ok(Self::Ready(Box::new(PostDetail::from_document(&doc)?))),
            Ok(None) | Err(ContentError::NotFound(_)) => Ok(Self::NotFound {
                slug: slug.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Loading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::memory::{post_document, MemorySource};

    #[tokio::test]
    async fn test_resolve_found() {
        let source = MemorySource::new(vec![post_document("hello", "Hello", None)]);
        match DetailState::resolve(&source, "hello").await.unwrap() {
            DetailState::Ready(post) => {
                assert_eq!(post.title, "Hello");
                assert_eq!(post.uid, "hello");
            }
            other => panic!("unexpected state: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resolve_not_found_is_terminal() {
        let source = MemorySource::new(vec![post_document("hello", "Hello", None)]);
        let state = DetailState::resolve(&source, "missing").await.unwrap();
        assert_eq!(
            state,
            DetailState::NotFound {
                slug: "missing".to_string()
            }
        );
        assert!(state.is_terminal());
        assert!(!DetailState::Loading.is_terminal());
    }

    #[tokio::test]
    async fn test_resolve_propagates_network_errors() {
        let source = MemorySource::new(vec![post_document("hello", "Hello", None)]);
        source.set_failing(true);
        let err = DetailState::resolve(&source, "hello").await.unwrap_err();
        assert!(matches!(err, ContentError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_resolve_malformed() {
        let mut doc = post_document("hello", "Hello", None);
        doc.data = serde_json::json!({ "title": "Hello" });
        let source = MemorySource::new(vec![doc]);
        assert!(matches!(
            DetailState::resolve(&source, "hello").await,
            Err(ContentError::Malformed(_))
        ));
    }
}
