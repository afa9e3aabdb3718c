//! Upstream release feed client.
//!
//! The feed is GitHub-shaped: a paginated list of releases, each with an
//! integer id, a tag name, a zipball URL, and a list of downloadable
//! assets. Anything else gets adapted to this shape behind the
//! [`ReleaseSource`] trait.

use async_trait::async_trait;
use semver::Version;
use serde::Deserialize;

use crate::error::{Result, UpdateError};

const GITHUB_API: &str = "https://api.github.com";
const PER_PAGE: u32 = 100;
const USER_AGENT: &str = concat!("updatch/", env!("CARGO_PKG_VERSION"));

/// One upstream release, post-parse.
#[derive(Debug, Clone)]
pub struct Release {
    pub id: u64,
    pub version: Version,
    pub zipball_url: String,
    pub assets: Vec<ReleaseAsset>,
}

/// One downloadable file attached to a release.
#[derive(Debug, Clone)]
pub struct ReleaseAsset {
    pub id: u64,
    pub name: String,
    pub download_url: String,
}

/// Capability to list the full release history of the upstream feed.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    async fn list_releases(&self) -> Result<Vec<Release>>;
}

#[derive(Debug, Deserialize)]
struct GhRelease {
    id: u64,
    tag_name: String,
    #[serde(default)]
    zipball_url: Option<String>,
    #[serde(default)]
    assets: Vec<GhAsset>,
}

#[derive(Debug, Deserialize)]
struct GhAsset {
    id: u64,
    name: String,
    browser_download_url: String,
}

/// GitHub Releases API source.
pub struct GithubReleaseSource {
    client: reqwest::Client,
    api_base: String,
    owner: String,
    repo: String,
}

impl GithubReleaseSource {
    pub fn new(owner: &str, repo: &str) -> Result<Self> {
        Self::with_api_base(owner, repo, GITHUB_API)
    }

    /// Point the source at a different API host (used by tests).
    pub fn with_api_base(owner: &str, repo: &str, api_base: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| UpdateError::Server(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    async fn fetch_page(&self, page: u32) -> Result<Vec<GhRelease>> {
        let url = format!(
            "{}/repos/{}/{}/releases",
            self.api_base, self.owner, self.repo
        );
        let response = self
            .client
            .get(&url)
            .query(&[("page", page), ("per_page", PER_PAGE)])
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| UpdateError::Upstream(format!("request to {url} failed: {e}")))?;

        if !response.status().is_success() {
            return Err(UpdateError::Upstream(format!(
                "{url} returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| UpdateError::Upstream(format!("malformed release page from {url}: {e}")))
    }
}

#[async_trait]
impl ReleaseSource for GithubReleaseSource {
    async fn list_releases(&self) -> Result<Vec<Release>> {
        let mut releases = Vec::new();

        // Pages are 1-indexed; an empty page terminates the walk. Results
        // accumulate across pages.
        for page in 1u32.. {
            let raw = self.fetch_page(page).await?;
            if raw.is_empty() {
                break;
            }

            for rel in raw {
                let version = match parse_tag(&rel.tag_name) {
                    Ok(v) => v,
                    Err(err) => {
                        tracing::warn!(
                            tag = %rel.tag_name,
                            %err,
                            "release is not semantically versioned, skipping"
                        );
                        continue;
                    }
                };
                tracing::debug!(%version, assets = rel.assets.len(), "listed release");
                releases.push(Release {
                    id: rel.id,
                    version,
                    zipball_url: rel.zipball_url.unwrap_or_default(),
                    assets: rel
                        .assets
                        .into_iter()
                        .map(|a| ReleaseAsset {
                            id: a.id,
                            name: a.name,
                            download_url: a.browser_download_url,
                        })
                        .collect(),
                });
            }
        }

        Ok(releases)
    }
}

/// Parse a release tag as semver, stripping an optional `v` prefix.
pub fn parse_tag(tag: &str) -> Result<Version> {
    let version_str = tag.strip_prefix('v').unwrap_or(tag);
    Ok(Version::parse(version_str)?)
}
