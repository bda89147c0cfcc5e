//! HTTP client for a Prismic-compatible content API

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::{ApiPage, ContentError, ContentSource, Cursor, Document};
use crate::config::CmsConfig;

/// API root document, used to find the master ref
#[derive(Debug, Deserialize)]
struct ApiRoot {
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master: bool,
}

/// Content API client
///
/// By default the master ref is resolved on first use and reused for the
/// lifetime of the client, so one build renders one consistent content
/// snapshot. A long-lived client (the server) bounds its age with
/// [`with_ref_max_age`](Self::with_ref_max_age) so new and edited posts
/// become visible.
pub struct PrismicClient {
    http: reqwest::Client,
    endpoint: Url,
    access_token: Option<String>,
    document_type: String,
    master_ref: Mutex<Option<CachedRef>>,
    ref_max_age: Option<Duration>,
}

#[derive(Debug)]
struct CachedRef {
    reference: String,
    fetched_at: Instant,
}

impl PrismicClient {
    /// Create a client from the `cms` section of the site config
    pub fn new(config: &CmsConfig) -> Result<Self, ContentError> {
        let endpoint = Url::parse(config.endpoint.trim_end_matches('/')).map_err(|e| {
            ContentError::Malformed(format!("invalid cms.endpoint {:?}: {}", config.endpoint, e))
        })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
            document_type: config.document_type.clone(),
            master_ref: Mutex::new(None),
            ref_max_age: None,
        })
    }

    /// Re-read the master ref once the cached one is older than `max_age`
    ///
    /// `Duration::ZERO` reads it before every query.
    pub fn with_ref_max_age(mut self, max_age: Duration) -> Self {
        self.ref_max_age = Some(max_age);
        self
    }

    async fn master_ref(&self) -> Result<String, ContentError> {
        let mut cached = self.master_ref.lock().await;
        if let Some(current) = cached.as_ref() {
            let fresh = self
                .ref_max_age
                .map_or(true, |max_age| current.fetched_at.elapsed() < max_age);
            if fresh {
                return Ok(current.reference.clone());
            }
        }

        let mut url = self.endpoint.clone();
        if let Some(token) = &self.access_token {
            url.query_pairs_mut().append_pair("access_token", token);
        }
        let root: ApiRoot = self.get_json(url).await?;
        let master = root
            .refs
            .into_iter()
            .find(|r| r.is_master)
            .ok_or_else(|| ContentError::Malformed("API root has no master ref".into()))?;
        tracing::debug!("Using master ref {}", master.reference);

        *cached = Some(CachedRef {
            reference: master.reference.clone(),
            fetched_at: Instant::now(),
        });
        Ok(master.reference)
    }

    /// Run a predicate query against the search endpoint
    async fn search(&self, query: &str, page_size: usize) -> Result<ApiPage, ContentError> {
        let reference = self.master_ref().await?;
        let mut url = self.search_url();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("ref", &reference)
                .append_pair("q", query)
                .append_pair("pageSize", &page_size.to_string());
            if let Some(token) = &self.access_token {
                pairs.append_pair("access_token", token);
            }
        }
        self.get_page(url).await
    }

    /// Fetch a result page; its cursor never carries the access token
    ///
    /// Cursors end up in rendered HTML and `/api/posts` responses, so the
    /// token is stripped here and added back by `follow`.
    async fn get_page(&self, url: Url) -> Result<ApiPage, ContentError> {
        let mut page: ApiPage = self.get_json(url).await?;
        page.next_page = page.next_page.map(|cursor| strip_token(&cursor));
        Ok(page)
    }

    fn search_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("documents").push("search");
        }
        url
    }

    /// Reject cursors that would send the client somewhere else
    fn check_cursor(&self, cursor: &Cursor) -> Result<Url, ContentError> {
        let url = Url::parse(cursor.as_str())
            .map_err(|e| ContentError::InvalidCursor(format!("{}: {}", cursor, e)))?;
        let same_origin = url.scheme() == self.endpoint.scheme()
            && url.host_str() == self.endpoint.host_str()
            && url.port_or_known_default() == self.endpoint.port_or_known_default();
        if !same_origin {
            return Err(ContentError::InvalidCursor(cursor.to_string()));
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ContentError> {
        tracing::debug!("GET {}", url);
        let resp = self.http.get(url.clone()).send().await?;

        if !resp.status().is_success() {
            return Err(ContentError::Status {
                status: resp.status().as_u16(),
                url: redact(&url),
            });
        }

        let body = resp.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| ContentError::Malformed(format!("{}: {}", redact(&url), e)))
    }
}

#[async_trait]
impl ContentSource for PrismicClient {
    async fn first_page(&self, page_size: usize) -> Result<ApiPage, ContentError> {
        let query = format!("[[at(document.type,\"{}\")]]", self.document_type);
        self.search(&query, page_size).await
    }

    async fn follow(&self, cursor: &Cursor) -> Result<ApiPage, ContentError> {
        let mut url = self.check_cursor(cursor)?;
        if let Some(token) = &self.access_token {
            url = with_query_pair_removed(&url, "access_token");
            url.query_pairs_mut().append_pair("access_token", token);
        }
        self.get_page(url).await
    }

    async fn by_uid(&self, uid: &str) -> Result<Option<Document>, ContentError> {
        if uid.is_empty() || uid.contains(['"', '[', ']']) {
            return Ok(None);
        }
        let query = format!("[[at(my.{}.uid,\"{}\")]]", self.document_type, uid);
        let page = self.search(&query, 1).await?;
        Ok(page.results.into_iter().next())
    }
}

/// URL without its query string, for errors and logs
fn redact(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

fn with_query_pair_removed(url: &Url, key: &str) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut url = url.clone();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    url
}

/// Cursor without the `access_token` query parameter
fn strip_token(cursor: &Cursor) -> Cursor {
    match Url::parse(cursor.as_str()) {
        Ok(url) => Cursor::new(with_query_pair_removed(&url, "access_token").to_string()),
        // follow rejects it anyway
        Err(_) => cursor.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str) -> PrismicClient {
        let config = CmsConfig {
            endpoint: endpoint.to_string(),
            ..CmsConfig::default()
        };
        PrismicClient::new(&config).unwrap()
    }

    #[test]
    fn test_search_url() {
        let client = client("https://repo.cdn.prismic.io/api/v2/");
        assert_eq!(
            client.search_url().as_str(),
            "https://repo.cdn.prismic.io/api/v2/documents/search"
        );
    }

    #[test]
    fn test_check_cursor() {
        let client = client("https://repo.cdn.prismic.io/api/v2");
        let ok = Cursor::new("https://repo.cdn.prismic.io/api/v2/documents/search?page=2");
        assert!(client.check_cursor(&ok).is_ok());

        let foreign = Cursor::new("https://evil.example.com/api/v2/documents/search?page=2");
        assert!(matches!(
            client.check_cursor(&foreign),
            Err(ContentError::InvalidCursor(_))
        ));

        let garbage = Cursor::new("not a url");
        assert!(client.check_cursor(&garbage).is_err());
    }

    #[test]
    fn test_strip_token() {
        let cursor = Cursor::new(
            "https://repo.cdn.prismic.io/api/v2/documents/search?ref=abc&access_token=secret&page=2",
        );
        assert_eq!(
            strip_token(&cursor).as_str(),
            "https://repo.cdn.prismic.io/api/v2/documents/search?ref=abc&page=2"
        );

        let only_token =
            Cursor::new("https://repo.cdn.prismic.io/api/v2/documents/search?access_token=secret");
        assert_eq!(
            strip_token(&only_token).as_str(),
            "https://repo.cdn.prismic.io/api/v2/documents/search"
        );
    }

    #[test]
    fn test_redact() {
        let url = Url::parse("https://repo.cdn.prismic.io/api/v2?access_token=secret").unwrap();
        assert_eq!(redact(&url), "https://repo.cdn.prismic.io/api/v2");
    }
}
