//! Host key loading and the allow-listed public key.

use std::fmt;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use russh::keys::{HashAlg, PrivateKey, PublicKey, load_secret_key};

use crate::error::ConfigError;

/// Base64 wire blob of the built-in allowed key (RSA, from the demo's
/// `user_rsa_key` pair).
pub const DEFAULT_ALLOWED_KEY: &str = concat!(
    "AAAAB3NzaC1yc2EAAAABIwAAAIEAyO4it3fHlmGZWJaGrfeHOVY7RWO3P9M7hp",
    "fAu7jJ2d7eothvfeuoRFtJwhUmZDluRdFyhFY/hFAh76PJKGAusIqIQKlkJxMC",
    "KDqIexkgHAfID/6mqvmnSJf0b5W8v5h2pI/stOSwTQ+pxVhwJ9ctYDhRSlF0iT",
    "UWT10hcuO4Ks8=",
);

/// Load the server's host key from disk.
pub fn load_host_key(path: &Path) -> Result<PrivateKey, ConfigError> {
    load_secret_key(path, None).map_err(|e| ConfigError::HostKey {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// SHA-256 fingerprint of a public key, in OpenSSH's `SHA256:...` form.
pub fn fingerprint(key: &PublicKey) -> String {
    key.fingerprint(HashAlg::Sha256).to_string()
}

/// The one public key allowed to log in.
///
/// Stored as the raw SSH wire encoding so that matching is a byte-exact
/// comparison, independent of key type or size.
#[derive(Clone, PartialEq, Eq)]
pub struct AllowedKey {
    blob: Vec<u8>,
    algorithm: String,
}

impl AllowedKey {
    /// Decode a key from the base64 field of an OpenSSH public key line.
    pub fn from_base64(data: &str) -> Result<Self, ConfigError> {
        let blob = STANDARD
            .decode(data.trim())
            .map_err(|e| ConfigError::AllowedKey {
                message: e.to_string(),
            })?;
        Self::from_blob(blob)
    }

    /// Parse a full OpenSSH public key line (`<type> <base64> [comment]`).
    pub fn from_openssh(line: &str) -> Result<Self, ConfigError> {
        let mut fields = line.split_whitespace();
        let declared = fields.next().ok_or_else(|| ConfigError::AllowedKey {
            message: "empty public key line".to_string(),
        })?;
        let data = fields.next().ok_or_else(|| ConfigError::AllowedKey {
            message: format!("missing key data after '{}'", declared),
        })?;

        let key = Self::from_base64(data)?;
        if key.algorithm != declared {
            return Err(ConfigError::AllowedKey {
                message: format!(
                    "key type '{}' does not match encoded type '{}'",
                    declared, key.algorithm
                ),
            });
        }
        Ok(key)
    }

    /// Read an OpenSSH `.pub` file. The first non-comment line is used.
    pub fn from_openssh_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| ConfigError::AllowedKeyFile {
                path: path.to_path_buf(),
                source,
            })?;

        let line = contents
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && !l.starts_with('#'))
            .ok_or_else(|| ConfigError::AllowedKey {
                message: format!("no key found in {}", path.display()),
            })?;

        Self::from_openssh(line)
    }

    /// The built-in demo key ([`DEFAULT_ALLOWED_KEY`]).
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_base64(DEFAULT_ALLOWED_KEY)
    }

    /// Wrap an already decoded wire blob.
    ///
    /// The blob must start with an SSH string naming the key algorithm.
    pub fn from_blob(blob: Vec<u8>) -> Result<Self, ConfigError> {
        let algorithm = read_algorithm(&blob).ok_or_else(|| ConfigError::AllowedKey {
            message: "key blob does not start with an algorithm name".to_string(),
        })?;
        Ok(Self { blob, algorithm })
    }

    /// Algorithm name encoded in the key, e.g. `ssh-rsa`.
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// The raw wire bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.blob
    }

    /// Check whether `key` encodes to exactly the allowed bytes.
    pub fn matches(&self, key: &PublicKey) -> bool {
        key.to_bytes().is_ok_and(|bytes| bytes == self.blob)
    }
}

impl fmt::Debug for AllowedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllowedKey")
            .field("algorithm", &self.algorithm)
            .field("len", &self.blob.len())
            .finish()
    }
}

/// Read the leading SSH string (u32 big-endian length + bytes) as UTF-8.
fn read_algorithm(blob: &[u8]) -> Option<String> {
    let len_bytes: [u8; 4] = blob.get(..4)?.try_into().ok()?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    let name = blob.get(4..4usize.checked_add(len)?)?;
    if name.is_empty() {
        return None;
    }
    std::str::from_utf8(name).ok().map(str::to_string)
}
