//! Rich text to HTML, with syntax highlighting for preformatted blocks
//!
//! Output is inserted into pages unescaped. Block text is escaped here,
//! but embed HTML from the CMS is passed through as-is: the CMS is trusted.

use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use crate::cms::{BlockKind, RichTextBlock, Span, SpanKind};
use crate::helpers::html_escape;

/// Rich text renderer
pub struct RichTextRenderer {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
}

#[derive(Clone, Copy, PartialEq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn open(self) -> &'static str {
        match self {
            Self::Unordered => "<ul>",
            Self::Ordered => "<ol>",
        }
    }

    fn close(self) -> &'static str {
        match self {
            Self::Unordered => "</ul>",
            Self::Ordered => "</ol>",
        }
    }
}

impl RichTextRenderer {
    pub fn new() -> Self {
        Self::with_theme("base16-ocean.dark")
    }

    /// Create with a syntect theme for preformatted blocks
    pub fn with_theme(theme: &str) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: theme.to_string(),
        }
    }

    /// Render a sequence of blocks
    ///
    /// Consecutive list items are grouped into one `<ul>` / `<ol>`.
    pub fn render(&self, blocks: &[RichTextBlock]) -> String {
        let mut html = String::new();
        let mut list: Option<ListKind> = None;

        for block in blocks {
            let item_kind = match block.kind {
                BlockKind::ListItem => Some(ListKind::Unordered),
                BlockKind::OrderedListItem => Some(ListKind::Ordered),
                _ => None,
            };

            if list != item_kind {
                if let Some(open) = list {
                    html.push_str(open.close());
                }
                if let Some(kind) = item_kind {
                    html.push_str(kind.open());
                }
                list = item_kind;
            }

            html.push_str(&self.render_block(block));
        }

        if let Some(open) = list {
            html.push_str(open.close());
        }

        html
    }

    fn render_block(&self, block: &RichTextBlock) -> String {
        let class = block
            .label
            .as_deref()
            .map(|l| format!(r#" class="{}""#, html_escape(l)))
            .unwrap_or_default();
        let inner = || render_spans(&block.text, &block.spans);

        match block.kind {
            BlockKind::Paragraph => format!("<p{}>{}</p>", class, inner()),
            BlockKind::Heading1 => format!("<h1{}>{}</h1>", class, inner()),
            BlockKind::Heading2 => format!("<h2{}>{}</h2>", class, inner()),
            BlockKind::Heading3 => format!("<h3{}>{}</h3>", class, inner()),
            BlockKind::Heading4 => format!("<h4{}>{}</h4>", class, inner()),
            BlockKind::Heading5 => format!("<h5{}>{}</h5>", class, inner()),
            BlockKind::Heading6 => format!("<h6{}>{}</h6>", class, inner()),
            BlockKind::ListItem | BlockKind::OrderedListItem => {
                format!("<li{}>{}</li>", class, inner())
            }
            BlockKind::Preformatted => self.highlight_code(&block.text, block.label.as_deref()),
            BlockKind::Image => match block.url.as_deref() {
                Some(url) => format!(
                    r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
                    html_escape(url),
                    html_escape(block.alt.as_deref().unwrap_or(""))
                ),
                None => String::new(),
            },
            BlockKind::Embed => render_embed(block),
            BlockKind::Unknown => {
                tracing::debug!("Skipping unsupported rich text block");
                String::new()
            }
        }
    }

    /// Highlight a preformatted block whose label names a language
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let syntax = lang.and_then(|lang| {
            self.syntax_set
                .find_syntax_by_token(lang)
                .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
        });

        let (Some(syntax), Some(theme)) = (syntax, self.theme_set.themes.get(&self.theme_name))
        else {
            return format!("<pre>{}</pre>", html_escape(code));
        };

        match highlighted_html_for_string(code, &self.syntax_set, syntax, theme) {
            Ok(highlighted) => format!(
                r#"<figure class="highlight {}">{}</figure>"#,
                html_escape(lang.unwrap_or("text")),
                highlighted
            ),
            Err(_) => format!("<pre>{}</pre>", html_escape(code)),
        }
    }
}

impl Default for RichTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn render_embed(block: &RichTextBlock) -> String {
    let Some(oembed) = block.oembed.as_ref() else {
        return String::new();
    };
    let field = |name: &str| oembed.get(name).and_then(|v| v.as_str()).unwrap_or("");
    format!(
        r#"<div data-oembed="{}" data-oembed-type="{}" data-oembed-provider="{}">{}</div>"#,
        html_escape(field("embed_url")),
        html_escape(field("type")),
        html_escape(field("provider_name")),
        field("html")
    )
}

/// Apply inline spans to `text`
///
/// Offsets are UTF-16 code units. Overlapping spans that do not nest are
/// closed and reopened so the output stays well-formed.
pub fn render_spans(text: &str, spans: &[Span]) -> String {
    let mut spans: Vec<&Span> = spans.iter().filter(|s| s.start < s.end).collect();
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut out = String::with_capacity(text.len());
    let mut open: Vec<&Span> = Vec::new();
    let mut next = 0;
    let mut pos = 0;

    for c in text.chars() {
        close_ended(&mut out, &mut open, pos);
        while next < spans.len() && spans[next].start <= pos {
            out.push_str(&open_tag(spans[next]));
            open.push(spans[next]);
            next += 1;
        }

        match c {
            '\n' => out.push_str("<br />"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
        pos += c.len_utf16();
    }

    while let Some(span) = open.pop() {
        out.push_str(close_tag(span));
    }

    out
}

fn close_ended<'a>(out: &mut String, open: &mut Vec<&'a Span>, pos: usize) {
    let Some(first_ended) = open.iter().position(|s| s.end <= pos) else {
        return;
    };

    let mut reopen = Vec::new();
    while open.len() > first_ended {
        if let Some(span) = open.pop() {
            out.push_str(close_tag(span));
            if span.end > pos {
                reopen.push(span);
            }
        }
    }
    for span in reopen.into_iter().rev() {
        out.push_str(&open_tag(span));
        open.push(span);
    }
}

fn open_tag(span: &Span) -> String {
    match span.kind {
        SpanKind::Strong => "<strong>".to_string(),
        SpanKind::Em => "<em>".to_string(),
        SpanKind::Hyperlink => {
            let data = span.data.as_ref();
            let url = data
                .and_then(|d| d.get("url"))
                .and_then(|v| v.as_str())
                .unwrap_or("#");
            let target = data
                .and_then(|d| d.get("target"))
                .and_then(|v| v.as_str())
                .map(|t| format!(r#" target="{}" rel="noopener""#, html_escape(t)))
                .unwrap_or_default();
            format!(r#"<a href="{}"{}>"#, html_escape(url), target)
        }
        SpanKind::Label => {
            let label = span
                .data
                .as_ref()
                .and_then(|d| d.get("label"))
                .and_then(|v| v.as_str())
                .unwrap_or("");
            format!(r#"<span class="{}">"#, html_escape(label))
        }
        SpanKind::Unknown => "<span>".to_string(),
    }
}

fn close_tag(span: &Span) -> &'static str {
    match span.kind {
        SpanKind::Strong => "</strong>",
        SpanKind::Em => "</em>",
        SpanKind::Hyperlink => "</a>",
        SpanKind::Label | SpanKind::Unknown => "</span>",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn span(start: usize, end: usize, kind: SpanKind) -> Span {
        Span {
            start,
            end,
            kind,
            data: None,
        }
    }

    fn blocks(value: serde_json::Value) -> Vec<RichTextBlock> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_plain_text_is_escaped() {
        assert_eq!(render_spans("a < b & c", &[]), "a &lt; b &amp; c");
        assert_eq!(render_spans("one\ntwo", &[]), "one<br />two");
    }

    #[test]
    fn test_nested_spans() {
        let spans = vec![span(0, 11, SpanKind::Strong), span(6, 11, SpanKind::Em)];
        assert_eq!(
            render_spans("Hello world", &spans),
            "<strong>Hello <em>world</em></strong>"
        );
    }

    #[test]
    fn test_overlapping_spans_stay_well_formed() {
        let spans = vec![span(0, 5, SpanKind::Strong), span(3, 8, SpanKind::Em)];
        assert_eq!(
            render_spans("abcdefgh", &spans),
            "<strong>abc<em>de</em></strong><em>fgh</em>"
        );
    }

    #[test]
    fn test_hyperlink_span() {
        let link = Span {
            start: 5,
            end: 9,
            kind: SpanKind::Hyperlink,
            data: Some(json!({ "link_type": "Web", "url": "https://rocketseat.com.br" })),
        };
        assert_eq!(
            render_spans("Veja aqui", &[link]),
            r#"Veja <a href="https://rocketseat.com.br">aqui</a>"#
        );
    }

    #[test]
    fn test_utf16_offsets() {
        // 'ã' is one UTF-16 unit, the emoji is two
        let spans = vec![span(0, 4, SpanKind::Em), span(4, 7, SpanKind::Strong)];
        assert_eq!(
            render_spans("não 🚀x", &spans),
            "<em>não </em><strong>🚀x</strong>"
        );
    }

    #[test]
    fn test_render_blocks() {
        let renderer = RichTextRenderer::new();
        let html = renderer.render(&blocks(json!([
            { "type": "heading2", "text": "Title", "spans": [] },
            { "type": "paragraph", "text": "Body", "spans": [] },
            { "type": "list-item", "text": "one", "spans": [] },
            { "type": "list-item", "text": "two", "spans": [] },
            { "type": "o-list-item", "text": "first", "spans": [] },
            { "type": "paragraph", "text": "End", "spans": [] }
        ])));
        assert_eq!(
            html,
            "<h2>Title</h2><p>Body</p><ul><li>one</li><li>two</li></ul><ol><li>first</li></ol><p>End</p>"
        );
    }

    #[test]
    fn test_trailing_list_is_closed() {
        let renderer = RichTextRenderer::new();
        let html = renderer.render(&blocks(json!([
            { "type": "o-list-item", "text": "only", "spans": [] }
        ])));
        assert_eq!(html, "<ol><li>only</li></ol>");
    }

    #[test]
    fn test_image_and_embed() {
        let renderer = RichTextRenderer::new();
        let html = renderer.render(&blocks(json!([
            { "type": "image", "url": "https://images.prismic.io/a.png", "alt": "A \"quoted\" alt" },
            { "type": "embed", "oembed": {
                "type": "video",
                "embed_url": "https://youtu.be/x",
                "provider_name": "YouTube",
                "html": "<iframe src=\"https://youtube.com/embed/x\"></iframe>"
            } }
        ])));
        assert!(html.contains(r#"<img src="https://images.prismic.io/a.png" alt="A &quot;quoted&quot; alt" />"#));
        assert!(html.contains(r#"data-oembed-provider="YouTube""#));
        assert!(html.contains("<iframe src=\"https://youtube.com/embed/x\"></iframe>"));
    }

    #[test]
    fn test_preformatted() {
        let renderer = RichTextRenderer::new();
        let plain = renderer.render(&blocks(json!([
            { "type": "preformatted", "text": "x < y", "spans": [] }
        ])));
        assert_eq!(plain, "<pre>x &lt; y</pre>");

        let highlighted = renderer.render(&blocks(json!([
            { "type": "preformatted", "text": "fn main() {}", "spans": [], "label": "rust" }
        ])));
        assert!(highlighted.contains(r#"<figure class="highlight rust">"#));
        assert!(highlighted.contains("<pre"));
    }

    #[test]
    fn test_unknown_block_is_skipped() {
        let renderer = RichTextRenderer::new();
        let html = renderer.render(&blocks(json!([
            { "type": "table", "text": "ignored" },
            { "type": "paragraph", "text": "kept", "spans": [] }
        ])));
        assert_eq!(html, "<p>kept</p>");
    }
}
