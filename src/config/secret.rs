//! Secret material handed to the issuer.
//!
//! Secrets arrive as a mapping of key names to raw bytes, the shape of a
//! Kubernetes secret. [`SecretData::from_dir`] reads the same layout from a
//! mounted directory where each file name is a key.

use crate::error::{IssuerError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Secret key holding the CA API key.
pub const API_KEY: &str = "apikey";
/// Secret key holding the CA API secret.
pub const API_SECRET: &str = "apisecret";
/// Secret key holding the mTLS client certificate (PEM).
pub const CLIENT_CERT: &str = "cert";
/// Secret key holding the mTLS client private key (PEM).
pub const CLIENT_KEY: &str = "certkey";
/// Optional secret key holding extra trust anchors for the CA endpoint (PEM).
pub const CA_CERT: &str = "cacert";

/// Credentials mapping: secret key name to value.
#[derive(Clone, Default)]
pub struct SecretData {
    entries: HashMap<String, Vec<u8>>,
}

impl std::fmt::Debug for SecretData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.entries.keys().collect();
        keys.sort();
        f.debug_struct("SecretData").field("keys", &keys).finish()
    }
}

impl From<HashMap<String, Vec<u8>>> for SecretData {
    fn from(entries: HashMap<String, Vec<u8>>) -> Self {
        Self { entries }
    }
}

impl SecretData {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder-style [`SecretData::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.insert(key, value);
        self
    }

    /// Raw value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Raw value for `key`, failing when absent.
    pub fn require(&self, key: &str) -> Result<&[u8]> {
        self.get(key).ok_or_else(|| {
            IssuerError::ConfigError(format!("secret is missing required key '{}'", key))
        })
    }

    /// Value for `key` as UTF-8 text with surrounding whitespace removed.
    pub fn require_str(&self, key: &str) -> Result<String> {
        let bytes = self.require(key)?;
        let text = std::str::from_utf8(bytes).map_err(|e| {
            IssuerError::ConfigError(format!("secret key '{}' is not valid UTF-8: {}", key, e))
        })?;
        Ok(text.trim().to_string())
    }

    /// Load every regular file in `directory` as an entry keyed by file name.
    ///
    /// Hidden files are skipped, which ignores the `..data` bookkeeping links
    /// of a projected secret volume.
    pub fn from_dir(directory: &Path) -> Result<Self> {
        let mut data = SecretData::new();

        for entry in fs::read_dir(directory)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            data.insert(name, fs::read(&path)?);
        }

        Ok(data)
    }
}
