#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("release feed error: {0}")]
    Upstream(String),

    #[error("unknown OS in asset name: {0:?}")]
    UnknownOs(String),

    #[error("unknown architecture in asset name: {0:?}")]
    UnknownArch(String),

    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("bad version string: {0}")]
    BadVersion(#[from] semver::Error),

    #[error("checksum is required")]
    MissingChecksum,

    #[error("os is required")]
    MissingOs,

    #[error("arch is required")]
    MissingArch,

    #[error("no update asset for {os}/{arch}")]
    NoSuchPlatform { os: String, arch: String },

    #[error("no update available")]
    NoUpdateAvailable,

    #[error("patch generation failed: {0}")]
    Patch(String),

    #[error("private key error: {0}")]
    Key(String),

    #[error("signing failed: {0}")]
    Signing(#[from] rsa::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("server error: {0}")]
    Server(String),
}

pub type Result<T> = std::result::Result<T, UpdateError>;

impl From<UpdateError> for axum::response::Response {
    fn from(err: UpdateError) -> Self {
        use axum::http::StatusCode;
        use axum::response::IntoResponse;

        // "No update" is a sentinel outcome, not a failure.
        if matches!(err, UpdateError::NoUpdateAvailable) {
            return StatusCode::NO_CONTENT.into_response();
        }

        let status = match &err {
            UpdateError::BadVersion(_)
            | UpdateError::MissingChecksum
            | UpdateError::MissingOs
            | UpdateError::MissingArch
            | UpdateError::NoSuchPlatform { .. }
            | UpdateError::Patch(_) => StatusCode::EXPECTATION_FAILED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({ "error": err.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::Response;

    #[test]
    fn test_no_update_maps_to_204() {
        let res: Response = UpdateError::NoUpdateAvailable.into();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_resolver_errors_map_to_417() {
        for err in [
            UpdateError::MissingChecksum,
            UpdateError::MissingOs,
            UpdateError::MissingArch,
            UpdateError::NoSuchPlatform {
                os: "linux".to_string(),
                arch: "amd64".to_string(),
            },
            UpdateError::Patch("boom".to_string()),
        ] {
            let res: Response = err.into();
            assert_eq!(res.status(), StatusCode::EXPECTATION_FAILED);
        }
    }

    #[test]
    fn test_internal_errors_map_to_500() {
        let res: Response = UpdateError::Config("bad".to_string()).into();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
