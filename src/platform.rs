//! Platform identification for update assets.
//!
//! Update binaries are published under names of the form
//! `update_<os>_<arch>[.<suffix>]`. Both sets are closed: anything else is
//! either not an update asset at all, or an asset the operator should hear
//! about in the logs.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, UpdateError};

/// File name prefix shared by every update-eligible asset.
const ASSET_PREFIX: &str = "update_";

/// Operating systems the update server knows how to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    Darwin,
    Windows,
}

impl Os {
    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::Darwin => "darwin",
            Os::Windows => "windows",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Os {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linux" => Ok(Os::Linux),
            "darwin" => Ok(Os::Darwin),
            "windows" => Ok(Os::Windows),
            other => Err(UpdateError::UnknownOs(other.to_string())),
        }
    }
}

/// Architectures the update server knows how to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    Amd64,
    X86,
    Arm,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::X86 => "386",
            Arch::Arm => "arm",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arch {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "amd64" => Ok(Arch::Amd64),
            "386" => Ok(Arch::X86),
            "arm" => Ok(Arch::Arm),
            other => Err(UpdateError::UnknownArch(other.to_string())),
        }
    }
}

/// An `(os, arch)` pair, used as the catalog index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Parse client-supplied platform strings.
    pub fn parse(os: &str, arch: &str) -> Result<Self> {
        Ok(Self {
            os: os.parse()?,
            arch: arch.parse()?,
        })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

/// Classify an asset file name.
///
/// Returns `Ok(None)` when the name is not an update asset, and an error
/// when it has the update shape but names an OS or architecture outside
/// the closed sets (so the refresh log surfaces it).
pub fn classify(name: &str) -> Result<Option<Platform>> {
    let Some(rest) = name.strip_prefix(ASSET_PREFIX) else {
        return Ok(None);
    };
    let Some((os_token, arch_rest)) = rest.split_once('_') else {
        return Ok(None);
    };
    // An optional `.suffix` may follow the architecture.
    let arch_token = arch_rest.split('.').next().unwrap_or(arch_rest);
    if os_token.is_empty() || arch_token.is_empty() {
        return Ok(None);
    }

    let os = os_token.parse()?;
    let arch = arch_token.parse()?;
    Ok(Some(Platform { os, arch }))
}

/// Pure predicate form of [`classify`].
pub fn is_update_asset(name: &str) -> bool {
    matches!(classify(name), Ok(Some(_)))
}
