//! In-memory content source for tests

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{ApiPage, ContentError, ContentSource, Cursor, Document};

/// Serves a fixed set of documents, paginated like the real API
pub struct MemorySource {
    documents: Vec<Document>,
    failing: AtomicBool,
    pub calls: AtomicUsize,
}

impl MemorySource {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Make every subsequent request fail with a 503
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn page(&self, page: usize, page_size: usize) -> Result<ApiPage, ContentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ContentError::Status {
                status: 503,
                url: "memory://posts".to_string(),
            });
        }

        let total_pages = self.documents.len().div_ceil(page_size);
        let results = self
            .documents
            .iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .cloned()
            .collect();
        let next_page = (page < total_pages).then(|| {
            Cursor::new(format!(
                "memory://posts?page={}&pageSize={}",
                page + 1,
                page_size
            ))
        });

        Ok(ApiPage {
            page: page as u32,
            total_pages: total_pages as u32,
            total_results_size: self.documents.len() as u64,
            next_page,
            results,
        })
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn first_page(&self, page_size: usize) -> Result<ApiPage, ContentError> {
        self.page(1, page_size)
    }

    async fn follow(&self, cursor: &Cursor) -> Result<ApiPage, ContentError> {
        let query = cursor
            .as_str()
            .strip_prefix("memory://posts?")
            .ok_or_else(|| ContentError::InvalidCursor(cursor.to_string()))?;
        let mut page = None;
        let mut page_size = None;
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some(("page", v)) => page = v.parse().ok(),
                Some(("pageSize", v)) => page_size = v.parse().ok(),
                _ => {}
            }
        }
        match (page, page_size) {
            (Some(page), Some(page_size)) if page > 0 && page_size > 0 => {
                self.page(page, page_size)
            }
            _ => Err(ContentError::InvalidCursor(cursor.to_string())),
        }
    }

    async fn by_uid(&self, uid: &str) -> Result<Option<Document>, ContentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ContentError::Status {
                status: 503,
                url: "memory://posts".to_string(),
            });
        }
        Ok(self
            .documents
            .iter()
            .find(|d| d.uid.as_deref() == Some(uid))
            .cloned())
    }
}

/// A well-formed post document
pub fn post_document(uid: &str, title: &str, published: Option<&str>) -> Document {
    Document {
        id: format!("id-{}", uid),
        uid: Some(uid.to_string()),
        doc_type: "posts".to_string(),
        first_publication_date: published.map(str::to_string),
        last_publication_date: None,
        data: json!({
            "title": title,
            "subtitle": format!("Subtitle of {}", title),
            "author": "Danilo Vieira",
            "banner": { "url": format!("https://images.prismic.io/{}.png", uid) },
            "content": [
                {
                    "heading": "Intro",
                    "body": [{ "type": "paragraph", "text": "a b c", "spans": [] }]
                }
            ]
        }),
    }
}
