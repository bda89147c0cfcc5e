//! Build manifest
//!
//! Records which post pages the last build rendered and a hash of each
//! page, so unchanged pages are not rewritten and the server knows the
//! pre-rendered route set.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Manifest directory, relative to the site base
const MANIFEST_DIR: &str = ".spacetraveling";
/// Manifest file name
const MANIFEST_FILE: &str = ".spacetraveling/manifest.json";

/// A pre-rendered post page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Hash of the rendered HTML
    pub content_hash: u64,
    /// Output path relative to the public dir
    pub output_path: String,
}

/// Manifest of the last build
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Version of the manifest format
    pub version: u32,
    pub generated_at: Option<DateTime<Utc>>,
    /// Entries keyed by slug
    pub posts: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Current manifest format version
    const VERSION: u32 = 1;

    /// Create an empty manifest with version set
    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            ..Default::default()
        }
    }

    /// Load the manifest from disk, or an empty one
    pub fn load(base_dir: &Path) -> Self {
        let path = base_dir.join(MANIFEST_FILE);
        if let Ok(content) = fs::read_to_string(&path) {
            match serde_json::from_str::<Manifest>(&content) {
                Ok(manifest) if manifest.version == Self::VERSION => return manifest,
                Ok(_) => tracing::info!("Manifest version mismatch, starting fresh"),
                Err(e) => tracing::warn!("Ignoring unreadable manifest {:?}: {}", path, e),
            }
        }
        Self::new()
    }

    /// Save the manifest to disk
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        fs::create_dir_all(base_dir.join(MANIFEST_DIR))?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(base_dir.join(MANIFEST_FILE), content)?;
        Ok(())
    }

    /// Whether `slug` was rendered with exactly this content
    pub fn is_unchanged(&self, slug: &str, content_hash: u64) -> bool {
        self.posts
            .get(slug)
            .is_some_and(|entry| entry.content_hash == content_hash)
    }

    pub fn record(&mut self, slug: &str, content_hash: u64, output_path: String) {
        self.posts.insert(
            slug.to_string(),
            ManifestEntry {
                content_hash,
                output_path,
            },
        );
    }

    /// Whether `slug` belongs to the pre-rendered route set
    pub fn contains(&self, slug: &str) -> bool {
        self.posts.contains_key(slug)
    }
}

/// Calculate a hash for content
pub fn hash_content(content: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

/// Delete the manifest directory
pub fn clear(base_dir: &Path) -> Result<()> {
    let dir = base_dir.join(MANIFEST_DIR);
    if dir.exists() {
        fs::remove_dir_all(&dir)?;
        tracing::info!("Deleted: {:?}", dir);
    }
    Ok(())
}
