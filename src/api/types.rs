//! Wire types for the update protocol.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Responses always announce a server-initiated update.
pub const INITIATIVE_AUTO: &str = "auto";
pub const PATCH_TYPE_BSDIFF: &str = "bsdiff";
pub const PATCH_TYPE_NONE: &str = "";

/// A client's update query (`POST /update`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateQuery {
    /// Protocol version; anything below 1 is treated as 1.
    #[serde(default = "default_protocol_version")]
    pub version: i64,
    /// Semver of the running application.
    #[serde(default)]
    pub app_version: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub arch: String,
    /// Hex SHA-256 of the binary the client is currently running.
    #[serde(default)]
    pub checksum: String,
    /// Older clients send platform info here; non-empty `os`/`arch`
    /// entries override the top-level fields.
    #[serde(default)]
    pub tags: Option<HashMap<String, String>>,
}

fn default_protocol_version() -> i64 {
    1
}

impl Default for UpdateQuery {
    fn default() -> Self {
        Self {
            version: default_protocol_version(),
            app_version: String::new(),
            os: String::new(),
            arch: String::new(),
            checksum: String::new(),
            tags: None,
        }
    }
}

/// The server's answer to an update query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub initiative: String,
    /// Download URL of the full replacement binary.
    pub url: String,
    /// Patch location; absent when no delta is offered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_url: Option<String>,
    /// `"bsdiff"` or empty for a full update.
    pub patch_type: String,
    pub version: String,
    pub checksum: String,
    pub signature: String,
}
