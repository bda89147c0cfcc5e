//! Generate static files

use anyhow::Result;

use crate::generator::Generator;
use crate::Site;

/// Fetch every post from the CMS and render the site
pub async fn run(site: &Site) -> Result<()> {
    let start = std::time::Instant::now();

    let client = site.content_client()?;
    let generator = Generator::new(site)?;
    let report = generator.generate(&client).await?;

    tracing::info!(
        "{} posts: {} written, {} unchanged",
        report.posts,
        report.written,
        report.unchanged
    );
    tracing::info!("Generated in {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}
