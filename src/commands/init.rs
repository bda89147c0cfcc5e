//! Initialize a new site

use anyhow::{bail, Result};
use std::fs;
use std::path::Path;

const CONFIG_TEMPLATE: &str = r#"# spacetraveling configuration

# Site
title: spacetraveling
description: ''
author: ''
language: pt-BR
timezone: UTC

# URL
url: http://localhost:4000
root: /

# Directory
public_dir: public
static_dir: static

# Listing
per_page: 1
prerender_page_size: 100

# Post pages
words_per_minute: 200
revalidate: 1800
date_format: '%-d %b %Y'
highlight_theme: base16-ocean.dark

# Content API
cms:
  endpoint: https://spacetraveling.cdn.prismic.io/api/v2
  access_token:
  document_type: posts
  timeout_secs: 30
"#;

const LOGO_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="240" height="26" viewBox="0 0 240 26"><text x="0" y="20" font-family="Inter, sans-serif" font-size="22" fill="#F8F8F8">spacetraveling<tspan fill="#FF57B2">.</tspan></text></svg>
"##;

/// Initialize a new site in the given directory
///
/// Refuses to touch a directory that already has a `_config.yml`.
pub fn init_site(target_dir: &Path) -> Result<()> {
    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        bail!("{:?} already exists, refusing to overwrite", config_path);
    }

    fs::create_dir_all(target_dir.join("static/images"))?;
    fs::create_dir_all(target_dir.join("languages"))?;

    fs::write(&config_path, CONFIG_TEMPLATE)?;

    let logo_path = target_dir.join("static/images/logo.svg");
    if !logo_path.exists() {
        fs::write(&logo_path, LOGO_SVG)?;
    }

    Ok(())
}
