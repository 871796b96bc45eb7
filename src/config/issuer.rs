//! Issuer specification.
//!
//! The issuer specification is the non-secret half of the configuration: the
//! CA endpoint and the knobs controlling how requests are built and how the
//! issued certificate is retrieved. It is deserialized from camelCase JSON,
//! the shape an issuer resource carries.

use crate::error::{IssuerError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default per-request timeout towards the CA.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// How the not-after of an outbound request is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum ExpiryPolicy {
    /// Leave the expiry to the CA. Sent as the epoch sentinel, which the CA
    /// reads as the maximum validity allowed by the account policy.
    #[default]
    CaAssigned,
    /// Request a fixed validity measured from not-before.
    Explicit {
        /// Requested lifetime in seconds
        seconds: u64,
    },
}

/// How the issued certificate is retrieved after submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalPolicy {
    /// Number of retrieval attempts, at least one
    pub attempts: u32,
    /// Wait between attempts
    pub interval_seconds: u64,
}

impl Default for RetrievalPolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            interval_seconds: 2,
        }
    }
}

impl RetrievalPolicy {
    /// Wait between attempts as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECONDS
}

/// Issuer specification: where the CA lives and how to talk to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerSpec {
    /// Base URL of the CA API, e.g. `https://emea.api.hvca.globalsign.com:8443/v2`
    pub url: String,

    /// Timeout applied to each individual CA request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Not-after selection for outbound requests
    #[serde(default)]
    pub expiry: ExpiryPolicy,

    /// Certificate retrieval behaviour
    #[serde(default)]
    pub retrieval: RetrievalPolicy,
}

impl IssuerSpec {
    /// Create a specification for `url` with default settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            expiry: ExpiryPolicy::default(),
            retrieval: RetrievalPolicy::default(),
        }
    }

    /// Load a specification from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse a specification from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: IssuerSpec = serde_json::from_str(json)
            .map_err(|e| IssuerError::ConfigError(format!("Invalid issuer spec: {}", e)))?;
        Ok(spec)
    }

    /// Per-request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}
