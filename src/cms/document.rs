//! Wire shapes of the content API

use serde::{Deserialize, Serialize};

/// Opaque pointer to the next page of a paginated query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of query results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiPage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results_size: u64,
    /// `null` on the last page
    #[serde(default)]
    pub next_page: Option<Cursor>,
    pub results: Vec<Document>,
}

/// A CMS document with an untyped data payload
///
/// The payload is reprojected into domain types by `crate::content`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type", default)]
    pub doc_type: String,
    #[serde(default)]
    pub first_publication_date: Option<String>,
    #[serde(default)]
    pub last_publication_date: Option<String>,
    pub data: serde_json::Value,
}

/// Rich text block kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    #[serde(rename = "paragraph")]
    Paragraph,
    #[serde(rename = "heading1")]
    Heading1,
    #[serde(rename = "heading2")]
    Heading2,
    #[serde(rename = "heading3")]
    Heading3,
    #[serde(rename = "heading4")]
    Heading4,
    #[serde(rename = "heading5")]
    Heading5,
    #[serde(rename = "heading6")]
    Heading6,
    #[serde(rename = "preformatted")]
    Preformatted,
    #[serde(rename = "list-item")]
    ListItem,
    #[serde(rename = "o-list-item")]
    OrderedListItem,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "embed")]
    Embed,
    #[serde(other)]
    Unknown,
}

/// One block of a rich text field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextBlock {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<Span>,
    #[serde(default)]
    pub label: Option<String>,

    // image
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,

    // embed
    #[serde(default)]
    pub oembed: Option<serde_json::Value>,
}

impl RichTextBlock {
    /// Plain text block, mostly useful for fixtures
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Paragraph,
            text: text.into(),
            spans: Vec::new(),
            label: None,
            url: None,
            alt: None,
            oembed: None,
        }
    }
}

/// Inline formatting kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink,
    Label,
    #[serde(other)]
    Unknown,
}

/// Inline formatting over `[start, end)`, in UTF-16 code units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: SpanKind,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page() {
        let json = r#"{
            "page": 1,
            "results_per_page": 1,
            "total_pages": 2,
            "next_page": "https://repo.cdn.prismic.io/api/v2/documents/search?page=2",
            "results": [{
                "id": "YF0",
                "uid": "como-utilizar-hooks",
                "type": "posts",
                "first_publication_date": "2021-03-15T19:25:28+0000",
                "data": { "title": "Como utilizar Hooks" }
            }]
        }"#;
        let page: ApiPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.total_pages, 2);
        assert!(page.next_page.is_some());
        assert_eq!(page.results[0].uid.as_deref(), Some("como-utilizar-hooks"));
    }

    #[test]
    fn test_null_next_page() {
        let page: ApiPage = serde_json::from_str(r#"{"next_page": null, "results": []}"#).unwrap();
        assert!(page.next_page.is_none());
    }

    #[test]
    fn test_parse_blocks() {
        let json = r#"[
            {"type": "paragraph", "text": "Hello", "spans": [{"start": 0, "end": 5, "type": "strong"}]},
            {"type": "image", "url": "https://images.prismic.io/x.png", "alt": null},
            {"type": "table", "text": ""}
        ]"#;
        let blocks: Vec<RichTextBlock> = serde_json::from_str(json).unwrap();
        assert_eq!(blocks[0].kind, BlockKind::Paragraph);
        assert_eq!(blocks[0].spans[0].kind, SpanKind::Strong);
        assert_eq!(blocks[1].kind, BlockKind::Image);
        assert_eq!(blocks[1].text, "");
        assert_eq!(blocks[2].kind, BlockKind::Unknown);
    }
}
