//! Asset downloads into a content-addressed local cache.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::StreamExt;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::error::{Result, UpdateError};

const USER_AGENT: &str = concat!("updatch/", env!("CARGO_PKG_VERSION"));

/// Capability to materialize a remote asset on local disk.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Download `url` into the cache, returning the local path.
    /// A URL that is already cached is returned without network traffic.
    async fn fetch(&self, url: &str) -> Result<PathBuf>;
}

/// HTTP fetcher caching downloads under a single asset directory.
pub struct HttpFetcher {
    client: reqwest::Client,
    asset_dir: PathBuf,
}

impl HttpFetcher {
    pub fn new(asset_dir: PathBuf) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| UpdateError::Server(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, asset_dir })
    }

    /// Cache file name for a URL: a digest prefix keeps distinct release
    /// URLs apart even when their final path segments collide.
    fn cache_path(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        let tag = hex::encode(&digest[..8]);
        let name = url
            .split('?')
            .next()
            .unwrap_or(url)
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("asset");
        self.asset_dir.join(format!("{tag}_{name}"))
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<PathBuf> {
        let path = self.cache_path(url);
        if tokio::fs::try_exists(&path).await? {
            tracing::debug!(url, path = %path.display(), "asset already cached");
            return Ok(path);
        }

        tracing::info!(url, "downloading asset");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| UpdateError::Download {
                url: url.to_string(),
                source: e,
            })?;

        tokio::fs::create_dir_all(&self.asset_dir).await?;
        let part = partial_path(&path);
        let mut file = tokio::fs::File::create(&part).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| UpdateError::Download {
                url: url.to_string(),
                source: e,
            })?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);
        tokio::fs::rename(&part, &path).await?;

        Ok(path)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_cache_path_distinguishes_urls() {
        let fetcher = HttpFetcher::new(PathBuf::from("/tmp/assets")).unwrap();
        let a = fetcher.cache_path("https://host/releases/v1.0.0/update_linux_amd64");
        let b = fetcher.cache_path("https://host/releases/v1.2.0/update_linux_amd64");
        assert_ne!(a, b);
        assert!(a.to_string_lossy().ends_with("update_linux_amd64"));
    }

    #[test]
    fn test_cache_path_strips_query() {
        let fetcher = HttpFetcher::new(PathBuf::from("/tmp/assets")).unwrap();
        let p = fetcher.cache_path("https://host/file.bin?token=abc");
        assert!(p.to_string_lossy().ends_with("file.bin"));
    }

    #[tokio::test]
    async fn test_fetch_downloads_and_caches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/update_linux_amd64"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"binary v1".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = HttpFetcher::new(dir.path().to_path_buf()).unwrap();
        let url = format!("{}/update_linux_amd64", server.uri());

        let first = fetcher.fetch(&url).await.unwrap();
        assert_eq!(std::fs::read(&first).unwrap(), b"binary v1");

        // Second fetch must come from the cache (mock expects one call).
        let second = fetcher.fetch(&url).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_fetch_propagates_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = HttpFetcher::new(dir.path().to_path_buf()).unwrap();
        let err = fetcher
            .fetch(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::Download { .. }));
        // Nothing half-written is left behind.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
