//! Binary delta patches between cached assets.
//!
//! A patch upgrades the exact binary a client is running to the current
//! upgrade target. Patch files are content-addressed by the two source
//! checksums, so a pair is computed at most once and survives restarts on
//! disk. Producing a delta can take tens of seconds; concurrent requests
//! for the same pair coalesce onto a single computation.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use qbsdiff::Bsdiff;
use tokio::sync::Mutex;

use crate::error::{Result, UpdateError};
use crate::release::Asset;

/// A finished patch file under the patch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    /// File name relative to the patch directory, as handed to clients.
    pub file_name: String,
    pub path: PathBuf,
}

/// Computes and caches bsdiff deltas between two cached assets.
pub struct PatchEngine {
    patch_dir: PathBuf,
    /// Per-pair gate: at most one delta computation in flight per pair.
    inflight: DashMap<String, Arc<Mutex<()>>>,
    generated: AtomicU64,
}

impl PatchEngine {
    pub fn new(patch_dir: PathBuf) -> Self {
        Self {
            patch_dir,
            inflight: DashMap::new(),
            generated: AtomicU64::new(0),
        }
    }

    /// Patch file name for a `(current, target)` checksum pair.
    pub fn patch_file_name(current_checksum: &str, target_checksum: &str) -> String {
        format!("{current_checksum}-{target_checksum}.bsdiff")
    }

    /// Produce the delta upgrading `current` to `target`.
    ///
    /// Returns the existing patch file when the pair was computed before.
    pub async fn generate(&self, current: &Asset, target: &Asset) -> Result<Patch> {
        let file_name = Self::patch_file_name(&current.checksum, &target.checksum);
        let path = self.patch_dir.join(&file_name);

        let gate = self
            .inflight
            .entry(file_name.clone())
            .or_default()
            .clone();
        let _guard = gate.lock().await;

        if tokio::fs::try_exists(&path)
            .await
            .map_err(|e| UpdateError::Patch(format!("failed to stat {}: {e}", path.display())))?
        {
            tracing::debug!(file = %file_name, "patch already on disk");
            return Ok(Patch { file_name, path });
        }

        let old = tokio::fs::read(&current.local_path).await.map_err(|e| {
            UpdateError::Patch(format!(
                "failed to read current asset {}: {e}",
                current.local_path.display()
            ))
        })?;
        let new = tokio::fs::read(&target.local_path).await.map_err(|e| {
            UpdateError::Patch(format!(
                "failed to read target asset {}: {e}",
                target.local_path.display()
            ))
        })?;

        tracing::info!(
            from = %current.version,
            to = %target.version,
            file = %file_name,
            "generating patch"
        );

        let data = tokio::task::spawn_blocking(move || {
            let mut out = Vec::new();
            Bsdiff::new(&old, &new).compare(Cursor::new(&mut out))?;
            Ok::<_, std::io::Error>(out)
        })
        .await
        .map_err(|e| UpdateError::Patch(format!("patch task failed: {e}")))?
        .map_err(|e| UpdateError::Patch(format!("bsdiff failed: {e}")))?;

        tokio::fs::create_dir_all(&self.patch_dir)
            .await
            .map_err(|e| UpdateError::Patch(format!("failed to create patch dir: {e}")))?;
        let part = self.patch_dir.join(format!("{file_name}.part"));
        tokio::fs::write(&part, &data)
            .await
            .map_err(|e| UpdateError::Patch(format!("failed to write patch: {e}")))?;
        tokio::fs::rename(&part, &path)
            .await
            .map_err(|e| UpdateError::Patch(format!("failed to finalize patch: {e}")))?;

        let total = self.generated.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(file = %file_name, bytes = data.len(), total, "patch generated");

        Ok(Patch { file_name, path })
    }

    /// Number of deltas computed by this engine since startup.
    pub fn generated_count(&self) -> u64 {
        self.generated.load(Ordering::Relaxed)
    }
}
