//! Site configuration (_config.yml)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::helpers::locale_for;

/// Errors raised while loading or validating `_config.yml`
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,
    pub static_dir: String,

    // Listing
    pub per_page: usize,
    pub prerender_page_size: usize,

    // Post pages
    pub words_per_minute: usize,
    pub revalidate: u64,
    pub date_format: String,
    pub highlight_theme: String,

    // Content API
    pub cms: CmsConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            description: String::new(),
            author: String::new(),
            language: "pt-BR".to_string(),
            timezone: "UTC".to_string(),

            url: "http://localhost:4000".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),
            static_dir: "static".to_string(),

            per_page: 1,
            prerender_page_size: 100,

            words_per_minute: 200,
            revalidate: 60 * 30,
            date_format: "%-d %b %Y".to_string(),
            highlight_theme: "base16-ocean.dark".to_string(),

            cms: CmsConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the generator and server cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.per_page == 0 {
            return Err(ConfigError::Invalid("per_page must be at least 1".into()));
        }
        if self.prerender_page_size == 0 {
            return Err(ConfigError::Invalid(
                "prerender_page_size must be at least 1".into(),
            ));
        }
        if self.words_per_minute == 0 {
            return Err(ConfigError::Invalid(
                "words_per_minute must be at least 1".into(),
            ));
        }
        if self.cms.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("cms.endpoint is required".into()));
        }
        if locale_for(&self.language).is_none() {
            return Err(ConfigError::Invalid(format!(
                "unsupported language: {}",
                self.language
            )));
        }
        if self.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "unknown timezone: {}",
                self.timezone
            )));
        }
        Ok(())
    }
}

/// Headless CMS connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsConfig {
    /// Repository API base, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    pub document_type: String,
    pub timeout_secs: u64,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://spacetraveling.cdn.prismic.io/api/v2".to_string(),
            access_token: None,
            document_type: "posts".to_string(),
            timeout_secs: 30,
        }
    }
}
