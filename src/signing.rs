//! Checksums and signatures for catalog assets.
//!
//! Every asset the catalog serves carries a lowercase-hex SHA-256 checksum
//! and an RSA-PKCS1v15 signature over that digest, so clients can verify a
//! download before self-applying it.

use std::path::Path;

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::error::{Result, UpdateError};

/// Compute the SHA-256 digest of a file, streamed.
///
/// Returns the lowercase hex rendering alongside the raw digest bytes
/// (the raw form is what gets signed).
pub fn checksum_for_file(path: &Path) -> Result<(String, Vec<u8>)> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    let digest = hasher.finalize().to_vec();
    Ok((hex::encode(&digest), digest))
}

/// Signs asset digests with the server's RSA private key.
pub struct Signer {
    key: RsaPrivateKey,
}

impl Signer {
    pub fn new(key: RsaPrivateKey) -> Self {
        Self { key }
    }

    /// Load a PKCS#1 PEM private key from disk. Done once at startup.
    pub fn from_pem_file(path: &Path) -> Result<Self> {
        let pem = std::fs::read_to_string(path).map_err(|e| {
            UpdateError::Key(format!("failed to read {}: {e}", path.display()))
        })?;
        let key = RsaPrivateKey::from_pkcs1_pem(&pem)
            .map_err(|e| UpdateError::Key(format!("failed to parse {}: {e}", path.display())))?;
        Ok(Self { key })
    }

    /// Sign a SHA-256 digest, returning the signature as lowercase hex.
    pub fn sign_digest(&self, digest: &[u8]) -> Result<String> {
        let signature = self.key.sign(Pkcs1v15Sign::new::<Sha256>(), digest)?;
        Ok(hex::encode(signature))
    }

    /// Checksum and sign a file in one pass.
    ///
    /// Returns `(checksum_hex, signature_hex)`.
    pub fn sign_file(&self, path: &Path) -> Result<(String, String)> {
        let (checksum, digest) = checksum_for_file(path)?;
        let signature = self.sign_digest(&digest)?;
        Ok((checksum, signature))
    }

    /// Public counterpart, for verification.
    pub fn public_key(&self) -> RsaPublicKey {
        self.key.to_public_key()
    }
}
