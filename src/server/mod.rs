//! Blog server
//!
//! Serves the generated site and the two runtime surfaces a static build
//! cannot provide: on-demand rendering of posts that were not pre-rendered
//! (with a revalidation window), and the listing page's load-more endpoint.

mod revalidate;

pub use revalidate::{Claim, Lookup, RenderCache};

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::cache::Manifest;
use crate::cms::{ContentError, ContentSource, Cursor};
use crate::content::{DetailState, ListingState};
use crate::generator::Generator;
use crate::Site;

lazy_static! {
    static ref SLUG_RE: Regex = Regex::new(r"^[a-z0-9][a-z0-9_-]*$").unwrap();
}

/// Shared server state
pub struct ServerState {
    site: Site,
    generator: Generator,
    source: Arc<dyn ContentSource>,
    pages: RenderCache,
}

impl ServerState {
    /// Build the state, seeding the page cache with the pre-rendered posts
    /// listed in the build manifest
    pub fn new(site: &Site, source: Arc<dyn ContentSource>) -> Result<Self> {
        let generator = Generator::new(site)?;
        let pages = RenderCache::new(Duration::from_secs(site.config.revalidate));

        let manifest = Manifest::load(&site.base_dir);
        for (slug, entry) in &manifest.posts {
            let path = site.public_dir.join(&entry.output_path);
            let Ok(html) = fs::read_to_string(&path) else {
                tracing::debug!("Pre-rendered page {:?} is gone", path);
                continue;
            };
            let age = fs::metadata(&path)
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| modified.elapsed().ok())
                .unwrap_or_default();
            pages.seed(slug, Arc::from(html), age);
        }
        tracing::debug!("Seeded {} pre-rendered posts", manifest.posts.len());

        Ok(Self {
            site: site.clone(),
            generator,
            source,
            pages,
        })
    }

    fn html_page(&self, status: StatusCode, render: Result<String>) -> Response {
        match render {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!("Failed to render page: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
            }
        }
    }

    fn not_found(&self) -> Response {
        self.html_page(StatusCode::NOT_FOUND, self.generator.render_not_found())
    }

    /// Resolve a claimed slug through the CMS and record the outcome
    ///
    /// If the request is dropped mid-flight the claim releases the slot.
    async fn resolve(&self, claim: Claim<'_>) -> Response {
        let slug = claim.slug().to_string();
        match DetailState::resolve(self.source.as_ref(), &slug).await {
            Ok(DetailState::Ready(post)) => match self.generator.render_post(&post) {
                Ok(html) => {
                    if let Err(e) = self.generator.write_post(&slug, &html) {
                        tracing::warn!("Failed to persist post {:?}: {:#}", slug, e);
                    }
                    let html: Arc<str> = Arc::from(html);
                    claim.store(html.clone());
                    tracing::info!("Rendered post {}", slug);
                    Html(html.to_string()).into_response()
                }
                Err(e) => {
                    tracing::error!("Failed to render post {:?}: {:#}", slug, e);
                    self.stale_or(claim, StatusCode::INTERNAL_SERVER_ERROR)
                }
            },
            Ok(DetailState::NotFound { slug }) => {
                claim.store_missing();
                self.remove_stale_output(&slug);
                tracing::info!("No post {:?}", slug);
                self.not_found()
            }
            Ok(DetailState::Loading) => {
                drop(claim);
                self.loading()
            }
            Err(e) => {
                tracing::warn!("Failed to resolve post {:?}: {}", slug, e);
                self.stale_or(claim, StatusCode::BAD_GATEWAY)
            }
        }
    }

    /// Serve the last good render after a failed refresh, else the error page
    fn stale_or(&self, claim: Claim<'_>, status: StatusCode) -> Response {
        match claim.fail() {
            Some(html) => {
                tracing::info!("Serving stale page after failed refresh");
                Html(html.to_string()).into_response()
            }
            None => self.html_page(status, self.generator.render_error()),
        }
    }

    fn loading(&self) -> Response {
        let mut response = self.html_page(StatusCode::OK, self.generator.render_loading());
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, header::HeaderValue::from_static("no-store"));
        response
    }

    /// A post that was unpublished must not keep being served from disk
    fn remove_stale_output(&self, slug: &str) {
        let dir = self.site.public_dir.join("post").join(slug);
        if dir.exists() {
            if let Err(e) = fs::remove_dir_all(&dir) {
                tracing::warn!("Failed to remove {:?}: {}", dir, e);
            }
        }
    }
}

/// Build the application router
pub fn router(state: Arc<ServerState>) -> Router {
    let root = state.site.config.root.trim_end_matches('/').to_string();

    let app = Router::new()
        .route("/post/:slug", get(post_handler))
        .route("/post/:slug/", get(post_handler))
        .route("/api/posts", get(more_posts_handler))
        .fallback(fallback_handler)
        .with_state(state);

    let app = if root.is_empty() {
        app
    } else {
        Router::new().nest(&root, app)
    };

    app.layer(TraceLayer::new_for_http())
}

/// Start the server
pub async fn start(site: &Site, ip: &str, port: u16, open: bool) -> Result<()> {
    // every resolution reads the current master ref so edits show up
    let client = site.content_client()?.with_ref_max_age(Duration::ZERO);
    let source: Arc<dyn ContentSource> = Arc::new(client);
    let state = Arc::new(ServerState::new(site, source)?);
    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}{}", ip, port, site.config.root);
    println!("Server running at {}", url);
    println!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn post_handler(
    State(state): State<Arc<ServerState>>,
    Path(slug): Path<String>,
) -> Response {
    if !SLUG_RE.is_match(&slug) {
        return state.not_found();
    }

    match state.pages.lookup(&slug) {
        Lookup::Page(html) => Html(html.to_string()).into_response(),
        Lookup::Missing => state.not_found(),
        Lookup::Pending => state.loading(),
        Lookup::Resolve(claim) => state.resolve(claim).await,
    }
}

#[derive(Debug, Deserialize)]
struct MorePostsQuery {
    cursor: String,
}

/// Load-more response: rendered summaries and the cursor to continue from
#[derive(Debug, Serialize, Deserialize)]
pub struct MorePosts {
    pub html: String,
    pub next_page: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
}

async fn more_posts_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<MorePostsQuery>,
) -> Response {
    let listing = ListingState::from_cursor(Cursor::new(query.cursor));
    let next = match listing.load_more(state.source.as_ref()).await {
        Ok(next) => next,
        Err(e) => {
            tracing::warn!("Load more failed: {}", e);
            return api_error(status_for(&e), e.to_string());
        }
    };

    match state.generator.render_summaries(next.posts()) {
        Ok(html) => Json(MorePosts {
            html,
            next_page: next.next_page().map(|c| c.as_str().to_string()),
        })
        .into_response(),
        Err(e) => {
            tracing::error!("Failed to render summaries: {:#}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "render failed".to_string())
        }
    }
}

fn status_for(error: &ContentError) -> StatusCode {
    match error {
        ContentError::InvalidCursor(_) | ContentError::ListingExhausted => StatusCode::BAD_REQUEST,
        ContentError::NotFound(_) => StatusCode::NOT_FOUND,
        ContentError::Network(_) | ContentError::Status { .. } | ContentError::Malformed(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

fn api_error(status: StatusCode, error: String) -> Response {
    (status, Json(ApiError { error })).into_response()
}

/// Serve files from the public dir, `404.html` for anything unknown
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
) -> Response {
    let mut service = ServeDir::new(&state.site.public_dir).append_index_html_on_directories(true);
    match service.try_call(request).await {
        Ok(response) if response.status() == StatusCode::NOT_FOUND => state.not_found(),
        Ok(response) => response.into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}
