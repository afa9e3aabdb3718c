use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::fetch::HttpFetcher;
use crate::release::{GithubReleaseSource, ReleaseCatalog};
use crate::signing::Signer;

/// Execute the `refresh` command: one catalog refresh, then print the
/// per-platform upgrade targets.
pub async fn execute(owner: Option<String>, repo: Option<String>, key: Option<PathBuf>) -> Result<()> {
    let mut config = ServerConfig::load()?;
    if let Some(owner) = owner {
        config.feed_owner = owner;
    }
    if let Some(repo) = repo {
        config.feed_repo = repo;
    }
    if let Some(key) = key {
        config.private_key = key;
    }
    config.validate()?;

    std::fs::create_dir_all(&config.asset_dir)?;

    let signer = Arc::new(Signer::from_pem_file(&config.private_key)?);
    let source = Arc::new(GithubReleaseSource::new(
        &config.feed_owner,
        &config.feed_repo,
    )?);
    let fetcher = Arc::new(HttpFetcher::new(config.asset_dir.clone())?);
    let catalog = ReleaseCatalog::new(source, fetcher, signer);

    catalog.refresh().await?;

    let targets = catalog.latest_snapshot()?;
    if targets.is_empty() {
        println!("No update assets found in {}/{}.", config.feed_owner, config.feed_repo);
        return Ok(());
    }

    println!("{:<20} {:<12} CHECKSUM", "PLATFORM", "VERSION");
    for asset in &targets {
        println!(
            "{:<20} {:<12} {}",
            asset.platform().to_string(),
            asset.version.to_string(),
            asset.checksum,
        );
    }
    println!("\n{} platform(s) total", targets.len());

    Ok(())
}
