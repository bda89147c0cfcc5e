//! List posts

use anyhow::{anyhow, Result};

use crate::cms::ContentSource;
use crate::content::ListingState;
use crate::helpers::DateFormatter;
use crate::Site;

/// Walk the whole listing and print one line per post
pub async fn run(site: &Site) -> Result<()> {
    let client = site.content_client()?;
    let lines = post_lines(site, &client).await?;

    println!("Posts ({}):", lines.len());
    for line in lines {
        println!("  {}", line);
    }

    Ok(())
}

/// `date - slug - title [author]` for every post, in listing order
pub async fn post_lines<S>(site: &Site, source: &S) -> Result<Vec<String>>
where
    S: ContentSource + ?Sized,
{
    let config = &site.config;
    let dates = DateFormatter::new(&config.date_format, &config.language, &config.timezone)
        .ok_or_else(|| anyhow!("Unsupported language or timezone"))?;

    let listing = ListingState::initial(source, config.prerender_page_size)
        .await?
        .load_all(source)
        .await?;

    Ok(listing
        .posts()
        .map(|post| {
            let date = post
                .first_publication_date
                .map(|d| dates.format(&d))
                .unwrap_or_else(|| "-".to_string());
            format!("{} - {} - {} [{}]", date, post.uid, post.title, post.author)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::memory::{post_document, MemorySource};
    use crate::config::SiteConfig;

    #[tokio::test]
    async fn test_post_lines_walks_all_pages() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SiteConfig::default();
        config.prerender_page_size = 1;
        let site = Site::with_config(dir.path().to_path_buf(), config);

        let source = MemorySource::new(vec![
            post_document("first", "First", Some("2021-03-25T12:00:00+0000")),
            post_document("second", "Second", None),
        ]);

        let lines = post_lines(&site, &source).await.unwrap();
        assert_eq!(
            lines,
            vec![
                "25 mar 2021 - first - First [Danilo Vieira]",
                "- - second - Second [Danilo Vieira]",
            ]
        );
    }
}
