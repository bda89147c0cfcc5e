//! Built-in site templates using the Tera template engine
//!
//! Templates are embedded in the binary. Autoescaping is off: the view
//! structs below carry text that was escaped when they were built, and
//! rich text HTML that must be injected as-is.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

/// Stylesheet written to `css/style.css` unless the site ships its own
pub const DEFAULT_STYLESHEET: &str = include_str!("spacetraveling/style.css");

/// Template renderer with the embedded templates
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("spacetraveling/layout.html")),
            ("index.html", include_str!("spacetraveling/index.html")),
            ("post.html", include_str!("spacetraveling/post.html")),
            ("loading.html", include_str!("spacetraveling/loading.html")),
            ("not_found.html", include_str!("spacetraveling/not_found.html")),
            ("error.html", include_str!("spacetraveling/error.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("spacetraveling/partials/header.html"),
            ),
            (
                "partials/summary.html",
                include_str!("spacetraveling/partials/summary.html"),
            ),
            (
                "partials/summaries.html",
                include_str!("spacetraveling/partials/summaries.html"),
            ),
        ])?;

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub language: String,
    pub root: String,
    pub logo_url: String,
    pub generator: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryData {
    pub uid: String,
    pub url: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    /// Display date, e.g. `25 mar 2021`
    pub date: Option<String>,
    /// Machine-readable date for `<time datetime>`
    pub datetime: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub uid: String,
    pub title: String,
    pub author: String,
    pub date: Option<String>,
    pub datetime: Option<String>,
    pub banner_url: Option<String>,
    pub reading_time: usize,
    pub reading_time_label: String,
    pub sections: Vec<SectionData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionData {
    pub heading: String,
    /// Rendered rich text, inserted unescaped
    pub html: String,
}

/// Base context shared by every page
pub fn base_context(site: &SiteData, i18n: &HashMap<String, String>) -> Context {
    let mut context = Context::new();
    context.insert("site", site);
    context.insert("i18n", i18n);
    context
}
