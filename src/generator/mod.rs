//! Generator module - renders pages with the built-in Tera templates
//!
//! The same renderer backs the build (`generate`) and the server's runtime
//! surfaces, so a post resolved on demand looks exactly like a pre-rendered
//! one.

use anyhow::{anyhow, Context as _, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use tera::Context;
use walkdir::WalkDir;

use crate::cache::{hash_content, Manifest};
use crate::cms::ContentSource;
use crate::content::{reading_time, DetailState, ListingState, PostDetail, PostSummary};
use crate::helpers::{date_xml, full_url_for, html_escape, post_path, url_for, DateFormatter};
use crate::i18n::I18n;
use crate::richtext::RichTextRenderer;
use crate::templates::{
    base_context, PostData, SectionData, SiteData, SummaryData, TemplateRenderer,
    DEFAULT_STYLESHEET,
};
use crate::Site;

/// Outcome of a build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateReport {
    /// Posts on the initial listing page
    pub listed: usize,
    /// Post pages in the pre-rendered route set
    pub posts: usize,
    /// Post pages written this run
    pub written: usize,
    /// Post pages skipped because their content did not change
    pub unchanged: usize,
}

/// Static site generator using Tera templates
pub struct Generator {
    site: Site,
    renderer: TemplateRenderer,
    richtext: RichTextRenderer,
    dates: DateFormatter,
    i18n: I18n,
    site_data: SiteData,
    translations: HashMap<String, String>,
}

impl Generator {
    /// Create a new generator
    pub fn new(site: &Site) -> Result<Self> {
        let config = &site.config;
        let renderer = TemplateRenderer::new()?;
        let richtext = RichTextRenderer::with_theme(&config.highlight_theme);
        let dates = DateFormatter::new(&config.date_format, &config.language, &config.timezone)
            .ok_or_else(|| {
                anyhow!(
                    "Unsupported language {:?} or timezone {:?}",
                    config.language,
                    config.timezone
                )
            })?;

        let mut i18n = I18n::new(&config.language);
        i18n.load_languages(site.base_dir.join("languages"))?;
        let translations = i18n
            .get_all_translations()
            .into_iter()
            .map(|(key, value)| (key, html_escape(&value)))
            .collect();

        let site_data = SiteData {
            title: html_escape(&config.title),
            description: html_escape(&config.description),
            language: html_escape(&config.language),
            root: url_for(config, "/"),
            logo_url: url_for(config, "images/logo.svg"),
            generator: format!("spacetraveling {}", env!("CARGO_PKG_VERSION")),
        };

        Ok(Self {
            site: site.clone(),
            renderer,
            richtext,
            dates,
            i18n,
            site_data,
            translations,
        })
    }

    /// Generate the entire site from a content source
    ///
    /// Every page is fetched and rendered before anything is written, so a
    /// failure fetching the listing or any listed post aborts the build and
    /// leaves the previous output untouched.
    pub async fn generate<S>(&self, source: &S) -> Result<GenerateReport>
    where
        S: ContentSource + ?Sized,
    {
        let config = &self.site.config;

        let listing = ListingState::initial(source, config.per_page)
            .await
            .context("Failed to fetch the post listing")?;
        let index = self.render_listing(&listing)?;

        // Precompute the route set from every slug the CMS knows about
        let all = ListingState::initial(source, config.prerender_page_size)
            .await
            .context("Failed to fetch the post listing")?
            .load_all(source)
            .await
            .context("Failed to walk the post listing")?;

        let mut pages = Vec::with_capacity(all.len());
        for summary in all.posts() {
            let slug = summary.uid.as_str();
            let post = match DetailState::resolve(source, slug)
                .await
                .with_context(|| format!("Failed to fetch post {:?}", slug))?
            {
                DetailState::Ready(post) => post,
                _ => {
                    // Unpublished between the listing walk and now
                    tracing::warn!("Post {:?} disappeared during the build, skipping", slug);
                    continue;
                }
            };
            let html = self.render_post(&post)?;
            pages.push((slug.to_string(), html));
        }
        let not_found = self.render_not_found()?;

        fs::create_dir_all(&self.site.public_dir)?;
        self.write_output("css/style.css", DEFAULT_STYLESHEET)?;
        self.copy_static_assets()?;
        self.write_output("index.html", &index)?;
        tracing::debug!("Generated index with {} posts", listing.len());

        let previous = Manifest::load(&self.site.base_dir);
        let mut manifest = Manifest::new();
        let mut report = GenerateReport {
            listed: listing.len(),
            ..Default::default()
        };

        for (slug, html) in &pages {
            let hash = hash_content(html);
            let relative = post_output_path(slug);

            if previous.is_unchanged(slug, hash) && self.site.public_dir.join(&relative).exists() {
                tracing::debug!("Unchanged: {}", relative);
                report.unchanged += 1;
            } else {
                self.write_output(&relative, html)?;
                report.written += 1;
            }
            manifest.record(slug, hash, relative);
            report.posts += 1;
        }

        self.write_output("404.html", &not_found)?;

        manifest.generated_at = Some(Utc::now());
        manifest.save(&self.site.base_dir)?;

        Ok(report)
    }

    /// Render the listing page
    pub fn render_listing(&self, listing: &ListingState) -> Result<String> {
        let mut context = self.context();
        context.insert("canonical", &full_url_for(&self.site.config, "/"));
        context.insert("posts", &self.summaries(listing.posts()));
        context.insert(
            "next_page",
            &listing.next_page().map(|cursor| html_escape(cursor.as_str())),
        );
        context.insert(
            "load_more_endpoint",
            &url_for(&self.site.config, "api/posts"),
        );
        self.renderer.render("index.html", &context)
    }

    /// Render summaries as a fragment for the load-more endpoint
    pub fn render_summaries<'a, I>(&self, posts: I) -> Result<String>
    where
        I: IntoIterator<Item = &'a PostSummary>,
    {
        let mut context = self.context();
        context.insert("posts", &self.summaries(posts));
        self.renderer.render("partials/summaries.html", &context)
    }

    /// Render a post page
    pub fn render_post(&self, post: &PostDetail) -> Result<String> {
        let mut context = self.context();
        context.insert(
            "canonical",
            &full_url_for(&self.site.config, &post_path(&post.uid)),
        );
        context.insert("post", &self.post_data(post));
        self.renderer.render("post.html", &context)
    }

    /// Placeholder while a post is being resolved
    pub fn render_loading(&self) -> Result<String> {
        self.renderer.render("loading.html", &self.context())
    }

    pub fn render_not_found(&self) -> Result<String> {
        self.renderer.render("not_found.html", &self.context())
    }

    pub fn render_error(&self) -> Result<String> {
        self.renderer.render("error.html", &self.context())
    }

    /// Write a rendered post to `post/<slug>/index.html`
    pub fn write_post(&self, slug: &str, html: &str) -> Result<PathBuf> {
        self.write_output(&post_output_path(slug), html)
    }

    fn context(&self) -> Context {
        let mut context = base_context(&self.site_data, &self.translations);
        context.insert("canonical", &None::<String>);
        context
    }

    fn summaries<'a, I>(&self, posts: I) -> Vec<SummaryData>
    where
        I: IntoIterator<Item = &'a PostSummary>,
    {
        posts
            .into_iter()
            .map(|post| SummaryData {
                uid: html_escape(&post.uid),
                url: url_for(&self.site.config, &post_path(&post.uid)),
                title: html_escape(&post.title),
                subtitle: html_escape(&post.subtitle),
                author: html_escape(&post.author),
                date: post.first_publication_date.map(|d| self.dates.format(&d)),
                datetime: post.first_publication_date.map(|d| date_xml(&d)),
            })
            .collect()
    }

    fn post_data(&self, post: &PostDetail) -> PostData {
        let minutes = reading_time(&post.sections, self.site.config.words_per_minute);
        PostData {
            uid: html_escape(&post.uid),
            title: html_escape(&post.title),
            author: html_escape(&post.author),
            date: post.first_publication_date.map(|d| self.dates.format(&d)),
            datetime: post.first_publication_date.map(|d| date_xml(&d)),
            banner_url: post.banner_url.as_deref().map(html_escape),
            reading_time: minutes,
            reading_time_label: self.i18n.get_count("reading_time", minutes),
            sections: post
                .sections
                .iter()
                .map(|section| SectionData {
                    heading: html_escape(&section.heading),
                    html: self.richtext.render(&section.body),
                })
                .collect(),
        }
    }

    fn write_output(&self, relative: &str, content: &str) -> Result<PathBuf> {
        // Strip leading slash to avoid creating absolute paths
        let output_path = self.site.public_dir.join(relative.trim_start_matches('/'));
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| anyhow!("Failed to create dir {:?}: {}", parent, e))?;
        }
        fs::write(&output_path, content)
            .map_err(|e| anyhow!("Failed to write {:?}: {}", output_path, e))?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(output_path)
    }

    /// Copy static assets (images, css overrides) to the public directory
    fn copy_static_assets(&self) -> Result<()> {
        let static_dir = &self.site.static_dir;
        if !static_dir.exists() {
            return Ok(());
        }

        for entry in WalkDir::new(static_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(static_dir)?;
            let dest = self.site.public_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest)?;
        }

        Ok(())
    }
}

fn post_output_path(slug: &str) -> String {
    format!("{}index.html", post_path(slug))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::memory::{post_document, MemorySource};
    use crate::config::SiteConfig;

    fn site(dir: &std::path::Path) -> Site {
        Site::with_config(dir.to_path_buf(), SiteConfig::default())
    }

    fn source(n: usize) -> MemorySource {
        MemorySource::new(
            (1..=n)
                .map(|i| {
                    post_document(
                        &format!("post-{}", i),
                        &format!("Post {}", i),
                        Some("2021-03-25T12:00:00+0000"),
                    )
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_generate_writes_pages() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());
        let generator = Generator::new(&site).unwrap();

        let report = generator.generate(&source(3)).await.unwrap();
        assert_eq!(report.listed, 1);
        assert_eq!(report.posts, 3);
        assert_eq!(report.written, 3);

        let public = &site.public_dir;
        let index = fs::read_to_string(public.join("index.html")).unwrap();
        assert!(index.contains("Post 1"));
        assert!(!index.contains("Post 2"));
        assert!(index.contains("Carregar mais posts"));
        assert!(index.contains("25 mar 2021"));

        let post = fs::read_to_string(public.join("post/post-2/index.html")).unwrap();
        assert!(post.contains("<h1>Post 2</h1>"));
        assert!(post.contains("1 min"));
        assert!(post.contains("<p>a b c</p>"));
        assert!(post.contains(r#"<link rel="canonical" href="http://localhost:4000/post/post-2/">"#));

        assert!(public.join("404.html").exists());
        assert!(public.join("css/style.css").exists());

        let manifest = Manifest::load(dir.path());
        assert!(manifest.contains("post-3"));
    }

    #[tokio::test]
    async fn test_generate_skips_unchanged_posts() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(&site(dir.path())).unwrap();
        let source = source(2);

        generator.generate(&source).await.unwrap();
        let again = generator.generate(&source).await.unwrap();
        assert_eq!(again.written, 0);
        assert_eq!(again.unchanged, 2);
    }

    #[tokio::test]
    async fn test_generate_fails_on_initial_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(&site(dir.path())).unwrap();
        let source = source(2);
        source.set_failing(true);

        assert!(generator.generate(&source).await.is_err());
        assert!(!dir.path().join("public/index.html").exists());
    }

    #[tokio::test]
    async fn test_failed_post_leaves_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());
        let generator = Generator::new(&site).unwrap();

        let mut broken = post_document("post-2", "Post 2", None);
        broken.data = serde_json::json!({ "title": "Post 2", "author": "Someone" });
        let with_broken_post = MemorySource::new(vec![
            post_document("post-1", "Post 1", Some("2021-03-25T12:00:00+0000")),
            broken,
        ]);

        assert!(generator.generate(&with_broken_post).await.is_err());
        assert!(!site.public_dir.join("index.html").exists());
        assert!(!site.public_dir.join("post/post-1/index.html").exists());

        // an earlier build stays intact
        generator.generate(&source(1)).await.unwrap();
        let before = fs::read_to_string(site.public_dir.join("index.html")).unwrap();
        assert!(generator.generate(&with_broken_post).await.is_err());
        let after = fs::read_to_string(site.public_dir.join("index.html")).unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_listing_without_cursor_has_no_load_more() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(&site(dir.path())).unwrap();
        let source = source(1);

        let listing = ListingState::initial(&source, 1).await.unwrap();
        let html = generator.render_listing(&listing).unwrap();
        assert!(html.contains("Post 1"));
        assert!(!html.contains("id=\"load-more\""));
    }

    #[tokio::test]
    async fn test_null_timestamp_renders_without_date() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(&site(dir.path())).unwrap();
        let source = MemorySource::new(vec![post_document("draft", "Draft", None)]);

        let listing = ListingState::initial(&source, 1).await.unwrap();
        let html = generator.render_summaries(listing.posts()).unwrap();
        assert!(html.contains("data-uid=\"draft\""));
        assert!(!html.contains("<time"));
    }

    #[test]
    fn test_text_is_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Generator::new(&site(dir.path())).unwrap();
        let post = PostSummary {
            uid: "x".to_string(),
            first_publication_date: None,
            title: "<script>alert(1)</script>".to_string(),
            subtitle: String::new(),
            author: "A & B".to_string(),
        };

        let html = generator.render_summaries([&post]).unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("A &amp; B"));
    }

    #[test]
    fn test_static_assets_copied() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());
        fs::create_dir_all(site.static_dir.join("images")).unwrap();
        fs::write(site.static_dir.join("images/logo.svg"), "<svg/>").unwrap();

        Generator::new(&site).unwrap().copy_static_assets().unwrap();
        assert!(site.public_dir.join("images/logo.svg").exists());
    }
}
