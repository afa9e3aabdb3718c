//! In-memory index of update-eligible release assets.
//!
//! The catalog keeps two views over the same `Arc<Asset>` handles: the full
//! version history per platform (for current-binary lookup by checksum) and
//! the highest-semver asset per platform (the upgrade target). Both sit
//! behind a single readers-writer lock; refresh inserts one asset at a
//! time, so readers see each `(os, arch)` pair either before or after an
//! upsert, never mid-way.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use semver::Version;

use crate::error::{Result, UpdateError};
use crate::fetch::AssetFetcher;
use crate::platform::{self, Arch, Os, Platform};
use crate::release::source::{Release, ReleaseAsset, ReleaseSource};
use crate::signing::{checksum_for_file, Signer};

/// One update-eligible binary, fully processed: downloaded, hashed, signed.
#[derive(Debug)]
pub struct Asset {
    /// Upstream asset id.
    pub id: u64,
    pub name: String,
    pub version: Version,
    pub os: Os,
    pub arch: Arch,
    /// Upstream download URL, surfaced to clients as the full-update URL.
    pub url: String,
    pub local_path: PathBuf,
    /// Lowercase hex SHA-256 of the local file.
    pub checksum: String,
    /// Lowercase hex RSA-PKCS1v15 signature over the checksum digest.
    pub signature: String,
}

impl Asset {
    pub fn platform(&self) -> Platform {
        Platform::new(self.os, self.arch)
    }
}

#[derive(Default)]
struct CatalogIndex {
    /// Full history: platform -> version string -> asset.
    by_version: HashMap<Platform, HashMap<String, Arc<Asset>>>,
    /// Upgrade target: platform -> highest-semver asset.
    latest: HashMap<Platform, Arc<Asset>>,
}

/// The release catalog, rebuilt by polling the upstream feed.
pub struct ReleaseCatalog {
    source: Arc<dyn ReleaseSource>,
    fetcher: Arc<dyn AssetFetcher>,
    signer: Arc<Signer>,
    index: RwLock<CatalogIndex>,
}

impl ReleaseCatalog {
    pub fn new(
        source: Arc<dyn ReleaseSource>,
        fetcher: Arc<dyn AssetFetcher>,
        signer: Arc<Signer>,
    ) -> Self {
        Self {
            source,
            fetcher,
            signer,
            index: RwLock::new(CatalogIndex::default()),
        }
    }

    /// Pull the full release list and upsert every eligible asset.
    ///
    /// Upstream failure or a download/hash/sign failure aborts the refresh
    /// and leaves the previous catalog state intact. Assets with
    /// unrecognized platforms are skipped with a warning.
    pub async fn refresh(&self) -> Result<()> {
        let mut releases = self.source.list_releases().await?;
        // Highest release id first: version comparison decides "latest",
        // the id order makes equal-version replays deterministic.
        releases.sort_by(|a, b| b.id.cmp(&a.id));
        tracing::info!(releases = releases.len(), "refreshing catalog");

        for release in &releases {
            for raw in &release.assets {
                let platform = match platform::classify(&raw.name) {
                    Ok(Some(p)) => p,
                    Ok(None) => {
                        tracing::debug!(name = %raw.name, "not an update asset, skipping");
                        continue;
                    }
                    Err(err) => {
                        tracing::warn!(name = %raw.name, %err, "skipping asset");
                        continue;
                    }
                };

                if self.is_current(platform, release, raw)? {
                    continue;
                }

                // Download, hash and sign outside the lock so queries are
                // not starved while a large binary streams in.
                let asset = self.process_asset(release, raw, platform).await?;
                self.upsert(asset)?;
            }
        }

        Ok(())
    }

    /// True when the catalog already holds this exact upstream asset.
    fn is_current(&self, platform: Platform, release: &Release, raw: &ReleaseAsset) -> Result<bool> {
        let index = self.read()?;
        let current = index
            .by_version
            .get(&platform)
            .and_then(|versions| versions.get(&release.version.to_string()));
        Ok(matches!(current, Some(a) if a.id == raw.id && a.url == raw.download_url))
    }

    async fn process_asset(
        &self,
        release: &Release,
        raw: &ReleaseAsset,
        platform: Platform,
    ) -> Result<Arc<Asset>> {
        let local_path = self.fetcher.fetch(&raw.download_url).await?;
        let (checksum, digest) = checksum_for_file(&local_path)?;
        let signature = self.signer.sign_digest(&digest)?;

        Ok(Arc::new(Asset {
            id: raw.id,
            name: raw.name.clone(),
            version: release.version.clone(),
            os: platform.os,
            arch: platform.arch,
            url: raw.download_url.clone(),
            local_path,
            checksum,
            signature,
        }))
    }

    /// Insert an asset into both indices under the write lock.
    fn upsert(&self, asset: Arc<Asset>) -> Result<()> {
        let platform = asset.platform();
        let version_key = asset.version.to_string();
        let mut index = self.write()?;
        let versions = index.by_version.entry(platform).or_default();

        // Same version twice: the higher upstream id is the re-publish
        // and wins regardless of processing order.
        if let Some(existing) = versions.get(&version_key) {
            if asset.id < existing.id {
                return Ok(());
            }
        }

        // An asset is identified by its content on a given platform; a
        // checksum shared across versions keeps only the higher version.
        let collision = versions
            .iter()
            .find(|(v, a)| **v != version_key && a.checksum == asset.checksum)
            .map(|(v, a)| (v.clone(), a.version.clone()));
        if let Some((other_key, other_version)) = collision {
            tracing::warn!(
                %platform,
                checksum = %asset.checksum,
                version = %asset.version,
                duplicate_of = %other_version,
                "checksum collision across versions"
            );
            if other_version > asset.version {
                return Ok(());
            }
            versions.remove(&other_key);
        }

        versions.insert(version_key, asset.clone());

        // Equal versions never coexist (the insert above replaced the
        // slot), so >= keeps `latest` pointed at the surviving handle.
        match index.latest.get(&platform) {
            Some(current) if asset.version < current.version => {}
            _ => {
                tracing::info!(%platform, version = %asset.version, "new latest asset");
                index.latest.insert(platform, asset);
            }
        }

        Ok(())
    }

    /// Current upgrade target for a platform.
    pub fn latest_for(&self, os: &str, arch: &str) -> Result<Arc<Asset>> {
        let not_found = || UpdateError::NoSuchPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        };
        let platform = Platform::parse(os, arch).map_err(|_| not_found())?;
        let index = self.read()?;
        index.latest.get(&platform).cloned().ok_or_else(not_found)
    }

    /// Find the historical asset a client is currently running, by the
    /// checksum it advertises. When several versions share the checksum,
    /// the newest one strictly below the upgrade target is preferred.
    pub fn lookup_by_checksum(&self, os: &str, arch: &str, checksum: &str) -> Result<Option<Arc<Asset>>> {
        let Ok(platform) = Platform::parse(os, arch) else {
            return Ok(None);
        };
        let index = self.read()?;
        let Some(versions) = index.by_version.get(&platform) else {
            return Ok(None);
        };

        let latest_version = index.latest.get(&platform).map(|a| a.version.clone());
        let below_latest =
            |a: &Asset| latest_version.as_ref().map_or(true, |lv| a.version < *lv);
        let mut best: Option<&Arc<Asset>> = None;
        for asset in versions.values() {
            if asset.checksum != checksum {
                continue;
            }
            best = match best {
                None => Some(asset),
                Some(cur) => {
                    let prefer = match (below_latest(asset), below_latest(cur)) {
                        (true, false) => true,
                        (false, true) => false,
                        _ => asset.version > cur.version,
                    };
                    Some(if prefer { asset } else { cur })
                }
            };
        }
        Ok(best.cloned())
    }

    /// Snapshot of the per-platform upgrade targets, version-sorted.
    pub fn latest_snapshot(&self) -> Result<Vec<Arc<Asset>>> {
        let index = self.read()?;
        let mut assets: Vec<_> = index.latest.values().cloned().collect();
        assets.sort_by(|a, b| {
            (a.os.as_str(), a.arch.as_str(), &a.version).cmp(&(b.os.as_str(), b.arch.as_str(), &b.version))
        });
        Ok(assets)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, CatalogIndex>> {
        self.index
            .read()
            .map_err(|e| UpdateError::Server(format!("failed to acquire catalog read lock: {e}")))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, CatalogIndex>> {
        self.index
            .write()
            .map_err(|e| UpdateError::Server(format!("failed to acquire catalog write lock: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rsa::RsaPrivateKey;
    use sha2::Digest;
    use std::sync::{Mutex, OnceLock};

    /// Feed fake returning a canned release list, or an upstream error.
    struct FakeSource {
        releases: Mutex<Result<Vec<Release>>>,
    }

    impl FakeSource {
        fn new(releases: Vec<Release>) -> Arc<Self> {
            Arc::new(Self {
                releases: Mutex::new(Ok(releases)),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                releases: Mutex::new(Err(UpdateError::Upstream("feed down".to_string()))),
            })
        }

        fn set(&self, releases: Vec<Release>) {
            *self.releases.lock().unwrap() = Ok(releases);
        }
    }

    #[async_trait]
    impl ReleaseSource for FakeSource {
        async fn list_releases(&self) -> Result<Vec<Release>> {
            match &*self.releases.lock().unwrap() {
                Ok(rs) => Ok(rs.clone()),
                Err(_) => Err(UpdateError::Upstream("feed down".to_string())),
            }
        }
    }

    /// Fetcher fake materializing each URL as a deterministic local file
    /// whose content is derived from the URL itself.
    struct FakeFetcher {
        dir: tempfile::TempDir,
    }

    impl FakeFetcher {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                dir: tempfile::tempdir().unwrap(),
            })
        }
    }

    #[async_trait]
    impl AssetFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<PathBuf> {
            let name = hex::encode(sha2::Sha256::digest(url.as_bytes()));
            let path = self.dir.path().join(name);
            tokio::fs::write(&path, format!("contents of {url}")).await?;
            Ok(path)
        }
    }

    fn test_signer() -> Arc<Signer> {
        static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
        let key = KEY.get_or_init(|| {
            let mut rng = rand::thread_rng();
            RsaPrivateKey::new(&mut rng, 2048).unwrap()
        });
        Arc::new(Signer::new(key.clone()))
    }

    fn release(id: u64, version: &str, asset_names: &[&str]) -> Release {
        Release {
            id,
            version: Version::parse(version).unwrap(),
            zipball_url: format!("https://host/zip/{version}"),
            assets: asset_names
                .iter()
                .enumerate()
                .map(|(i, name)| ReleaseAsset {
                    id: id * 100 + i as u64,
                    name: (*name).to_string(),
                    download_url: format!("https://host/dl/{version}/{name}"),
                })
                .collect(),
        }
    }

    fn catalog(source: Arc<dyn ReleaseSource>) -> ReleaseCatalog {
        ReleaseCatalog::new(source, FakeFetcher::new(), test_signer())
    }

    #[tokio::test]
    async fn test_refresh_populates_both_indices() {
        let source = FakeSource::new(vec![
            release(1, "1.0.0", &["update_linux_amd64", "notes.txt"]),
            release(2, "1.2.0", &["update_linux_amd64", "update_darwin_amd64"]),
        ]);
        let catalog = catalog(source);
        catalog.refresh().await.unwrap();

        let latest = catalog.latest_for("linux", "amd64").unwrap();
        assert_eq!(latest.version, Version::new(1, 2, 0));
        assert!(!latest.checksum.is_empty());
        assert!(!latest.signature.is_empty());
        assert!(latest.local_path.exists());

        // The latest asset is reachable through its own checksum.
        let by_checksum = catalog
            .lookup_by_checksum("linux", "amd64", &latest.checksum)
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&latest, &by_checksum));

        let darwin = catalog.latest_for("darwin", "amd64").unwrap();
        assert_eq!(darwin.version, Version::new(1, 2, 0));
    }

    #[tokio::test]
    async fn test_latest_tracks_highest_semver() {
        // Feed order is irrelevant; ids deliberately disagree with semver.
        let source = FakeSource::new(vec![
            release(9, "1.1.0", &["update_linux_amd64"]),
            release(3, "2.0.0", &["update_linux_amd64"]),
            release(5, "1.5.0", &["update_linux_amd64"]),
        ]);
        let catalog = catalog(source);
        catalog.refresh().await.unwrap();

        let latest = catalog.latest_for("linux", "amd64").unwrap();
        assert_eq!(latest.version, Version::new(2, 0, 0));
    }

    #[tokio::test]
    async fn test_unknown_platform_is_skipped_not_fatal() {
        let source = FakeSource::new(vec![release(
            1,
            "1.0.0",
            &["update_solaris_amd64", "update_linux_amd64"],
        )]);
        let catalog = catalog(source);
        catalog.refresh().await.unwrap();

        assert!(catalog.latest_for("linux", "amd64").is_ok());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_catalog() {
        let source = FakeSource::new(vec![release(1, "1.0.0", &["update_linux_amd64"])]);
        let catalog = ReleaseCatalog::new(source.clone(), FakeFetcher::new(), test_signer());
        catalog.refresh().await.unwrap();

        *source.releases.lock().unwrap() = Err(UpdateError::Upstream("down".to_string()));
        assert!(catalog.refresh().await.is_err());

        let latest = catalog.latest_for("linux", "amd64").unwrap();
        assert_eq!(latest.version, Version::new(1, 0, 0));
    }

    #[tokio::test]
    async fn test_republish_replaces_same_version() {
        let source = FakeSource::new(vec![release(1, "1.0.0", &["update_linux_amd64"])]);
        let catalog = ReleaseCatalog::new(source.clone(), FakeFetcher::new(), test_signer());
        catalog.refresh().await.unwrap();
        let first = catalog.latest_for("linux", "amd64").unwrap();

        // Re-publish 1.0.0 as a new upstream release with a new asset URL.
        let mut republished = release(4, "1.0.0", &["update_linux_amd64"]);
        republished.assets[0].download_url =
            "https://host/dl/1.0.0-rebuilt/update_linux_amd64".to_string();
        source.set(vec![republished]);
        catalog.refresh().await.unwrap();

        let second = catalog.latest_for("linux", "amd64").unwrap();
        assert_eq!(second.version, first.version);
        assert_ne!(second.checksum, first.checksum);
        // Both indices point at the replacement handle.
        let looked_up = catalog
            .lookup_by_checksum("linux", "amd64", &second.checksum)
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&second, &looked_up));
        assert!(catalog
            .lookup_by_checksum("linux", "amd64", &first.checksum)
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_lower_id_never_overrides_same_version() {
        // Two releases claim 1.0.0; the higher id is the re-publish and
        // must win even though it is processed first (descending order).
        let newer = release(8, "1.0.0", &["update_linux_amd64"]);
        let newer_url = newer.assets[0].download_url.clone();
        let mut older = release(2, "1.0.0", &["update_linux_amd64"]);
        older.assets[0].download_url = "https://host/dl/old/update_linux_amd64".to_string();

        let catalog = catalog(FakeSource::new(vec![older, newer]));
        catalog.refresh().await.unwrap();

        let latest = catalog.latest_for("linux", "amd64").unwrap();
        assert_eq!(latest.url, newer_url);
    }

    #[tokio::test]
    async fn test_checksum_collision_keeps_higher_version() {
        // Same download URL for two versions -> same fetched content ->
        // same checksum.
        let mut v1 = release(1, "1.0.0", &["update_linux_amd64"]);
        let mut v2 = release(2, "1.1.0", &["update_linux_amd64"]);
        let shared = "https://host/dl/shared/update_linux_amd64".to_string();
        v1.assets[0].download_url = shared.clone();
        v2.assets[0].download_url = shared;

        let catalog = catalog(FakeSource::new(vec![v1, v2]));
        catalog.refresh().await.unwrap();

        let latest = catalog.latest_for("linux", "amd64").unwrap();
        assert_eq!(latest.version, Version::new(1, 1, 0));
        let found = catalog
            .lookup_by_checksum("linux", "amd64", &latest.checksum)
            .unwrap()
            .unwrap();
        // Only the higher-version entry survives.
        assert_eq!(found.version, Version::new(1, 1, 0));
    }

    #[tokio::test]
    async fn test_missing_platform_errors() {
        let catalog = catalog(FakeSource::new(vec![]));
        catalog.refresh().await.unwrap();

        assert!(matches!(
            catalog.latest_for("linux", "amd64"),
            Err(UpdateError::NoSuchPlatform { .. })
        ));
        // Unknown platform strings behave like absent platforms.
        assert!(matches!(
            catalog.latest_for("plan9", "amd64"),
            Err(UpdateError::NoSuchPlatform { .. })
        ));
        assert!(catalog
            .lookup_by_checksum("plan9", "amd64", "abc")
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_upstream_failure_surfaces() {
        let catalog = catalog(FakeSource::failing());
        assert!(matches!(
            catalog.refresh().await,
            Err(UpdateError::Upstream(_))
        ));
    }

    #[tokio::test]
    async fn test_latest_snapshot_sorted() {
        let source = FakeSource::new(vec![release(
            1,
            "1.0.0",
            &["update_windows_386", "update_darwin_arm", "update_linux_amd64"],
        )]);
        let catalog = catalog(source);
        catalog.refresh().await.unwrap();

        let snapshot = catalog.latest_snapshot().unwrap();
        let platforms: Vec<String> = snapshot.iter().map(|a| a.platform().to_string()).collect();
        assert_eq!(platforms, vec!["darwin/arm", "linux/amd64", "windows/386"]);
    }
}
