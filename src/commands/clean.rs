//! Clean the public directory

use anyhow::Result;
use std::fs;

use crate::cache;
use crate::Site;

/// Clean the public directory and the build manifest
pub fn run(site: &Site) -> Result<()> {
    if site.public_dir.exists() {
        fs::remove_dir_all(&site.public_dir)?;
        tracing::info!("Deleted: {:?}", site.public_dir);
    }

    cache::clear(&site.base_dir)?;

    Ok(())
}
