//! Decides what, if anything, a client should download.

use std::sync::Arc;

use semver::Version;

use crate::api::types::{UpdateQuery, UpdateResponse, INITIATIVE_AUTO, PATCH_TYPE_BSDIFF, PATCH_TYPE_NONE};
use crate::error::{Result, UpdateError};
use crate::patch::{Patch, PatchEngine};
use crate::release::{Asset, ReleaseCatalog};

/// Answers client update queries against the catalog, producing deltas
/// through the patch engine when the client's current binary is known.
pub struct UpdateResolver {
    catalog: Arc<ReleaseCatalog>,
    patcher: Arc<PatchEngine>,
}

impl UpdateResolver {
    pub fn new(catalog: Arc<ReleaseCatalog>, patcher: Arc<PatchEngine>) -> Self {
        Self { catalog, patcher }
    }

    /// Resolve a query to an update response.
    ///
    /// Returns [`UpdateError::NoUpdateAvailable`] when the client is
    /// already at or above the upgrade target; that outcome is a
    /// sentinel, not a failure.
    pub async fn check_for_update(&self, mut query: UpdateQuery) -> Result<UpdateResponse> {
        if query.version < 1 {
            query.version = 1;
        }

        // Older clients carry platform info in tags.
        if let Some(tags) = &query.tags {
            if let Some(os) = tags.get("os").filter(|os| !os.is_empty()) {
                query.os = os.clone();
            }
            if let Some(arch) = tags.get("arch").filter(|arch| !arch.is_empty()) {
                query.arch = arch.clone();
            }
        }

        let app_version = Version::parse(&query.app_version)?;
        if query.checksum.is_empty() {
            return Err(UpdateError::MissingChecksum);
        }
        if query.os.is_empty() {
            return Err(UpdateError::MissingOs);
        }
        if query.arch.is_empty() {
            return Err(UpdateError::MissingArch);
        }

        let latest = self.catalog.latest_for(&query.os, &query.arch)?;
        if latest.version <= app_version {
            return Err(UpdateError::NoUpdateAvailable);
        }

        let current = self
            .catalog
            .lookup_by_checksum(&query.os, &query.arch, &query.checksum)?;
        let Some(current) = current else {
            // Unknown build: nothing to diff against, offer the full binary.
            tracing::debug!(
                os = %query.os,
                arch = %query.arch,
                checksum = %query.checksum,
                "client checksum not in catalog, full update"
            );
            return Ok(full_update(&latest));
        };

        let patch = self.patcher.generate(&current, &latest).await?;
        Ok(patch_update(&latest, &patch))
    }
}

fn base_response(latest: &Asset) -> UpdateResponse {
    UpdateResponse {
        initiative: INITIATIVE_AUTO.to_string(),
        url: latest.url.clone(),
        patch_url: None,
        patch_type: PATCH_TYPE_NONE.to_string(),
        version: latest.version.to_string(),
        checksum: latest.checksum.clone(),
        signature: latest.signature.clone(),
    }
}

fn full_update(latest: &Asset) -> UpdateResponse {
    base_response(latest)
}

fn patch_update(latest: &Asset, patch: &Patch) -> UpdateResponse {
    UpdateResponse {
        patch_url: Some(patch.file_name.clone()),
        patch_type: PATCH_TYPE_BSDIFF.to_string(),
        ..base_response(latest)
    }
}
