use std::path::PathBuf;

/// Returns the base directory for server data.
///
/// Uses `$UPDATCH_HOME` if set, otherwise defaults to `~/.updatch`.
pub fn updatch_home() -> PathBuf {
    if let Ok(home) = std::env::var("UPDATCH_HOME") {
        return PathBuf::from(home);
    }

    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".updatch")
}

/// Directory where downloaded release assets are cached.
pub fn assets_dir() -> PathBuf {
    updatch_home().join("assets")
}

/// Directory where generated patch files are stored.
pub fn patches_dir() -> PathBuf {
    updatch_home().join("patches")
}

/// Path to the user configuration file.
pub fn config_path() -> PathBuf {
    updatch_home().join("config.toml")
}

/// Default location of the PEM signing key.
pub fn default_key_path() -> PathBuf {
    updatch_home().join("private.pem")
}
