//! Connection bootstrapping.
//!
//! Assembles the CA session configuration from the issuer specification and
//! the credential secret, then validates it before any session is opened.

use crate::cert::loader::{load_certificate_from_pem, load_certificates_from_pem, parse_certificate};
use crate::config::secret::{API_KEY, API_SECRET, CA_CERT, CLIENT_CERT, CLIENT_KEY};
use crate::config::{IssuerSpec, SecretData};
use crate::crypto::ClientKey;
use crate::error::{IssuerError, Result};
use crate::net::config::{build_mtls_config, TlsConfig};
use std::fmt;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Everything needed to open an authenticated CA session.
pub struct SessionConfig {
    /// Base URL of the CA API
    pub url: String,
    /// Account API key
    pub api_key: String,
    api_secret: String,
    /// mTLS client certificate in DER form
    pub client_cert_der: Vec<u8>,
    /// mTLS client private key
    pub client_key: ClientKey,
    /// Extra trust anchors for the CA endpoint in DER form
    pub trust_anchors: Vec<Vec<u8>>,
    /// Timeout applied to each CA request
    pub request_timeout: Duration,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key)
            .field("client_key", &self.client_key)
            .field("trust_anchors", &self.trust_anchors.len())
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl SessionConfig {
    /// Build and validate a session configuration.
    ///
    /// The secret must carry `apikey`, `apisecret`, `cert` and `certkey`;
    /// `cacert` is optional. The private key's PEM label selects its parser
    /// and an unrecognized label fails with
    /// [`IssuerError::UnknownKeyTypeError`].
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use atlas_issuer::config::{IssuerSpec, SecretData};
    /// use atlas_issuer::signer::bootstrap::SessionConfig;
    /// use std::path::Path;
    ///
    /// # fn example() -> atlas_issuer::error::Result<()> {
    /// let spec = IssuerSpec::new("https://emea.api.hvca.globalsign.com:8443/v2");
    /// let secret = SecretData::from_dir(Path::new("/var/run/secrets/hvca"))?;
    /// let session = SessionConfig::from_issuer_and_secret(&spec, &secret)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_issuer_and_secret(spec: &IssuerSpec, secret: &SecretData) -> Result<Self> {
        let api_key = secret.require_str(API_KEY)?;
        let api_secret = secret.require_str(API_SECRET)?;

        let client_cert_der = load_certificate_from_pem(secret.require(CLIENT_CERT)?)
            .map_err(|e| {
                IssuerError::ConfigError(format!("Failed to load mTLS client certificate: {}", e))
            })?;
        let client_key = ClientKey::from_pem(secret.require(CLIENT_KEY)?)?;

        let trust_anchors = match secret.get(CA_CERT) {
            Some(pem) => load_certificates_from_pem(pem).map_err(|e| {
                IssuerError::ConfigError(format!("Failed to load CA trust anchors: {}", e))
            })?,
            None => Vec::new(),
        };

        let config = Self {
            url: spec.url.clone(),
            api_key,
            api_secret,
            client_cert_der,
            client_key,
            trust_anchors,
            request_timeout: spec.request_timeout(),
        };
        config.validate()?;

        debug!(
            url = %config.url,
            key_encoding = ?config.client_key.encoding(),
            trust_anchors = config.trust_anchors.len(),
            "CA session configuration ready"
        );
        Ok(config)
    }

    /// Account API secret.
    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }

    /// Check that the configuration is complete and consistent.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.url)
            .map_err(|e| IssuerError::ConfigError(format!("Invalid CA URL '{}': {}", self.url, e)))?;
        if url.scheme() != "https" {
            return Err(IssuerError::ConfigError(format!(
                "CA URL must use https, got '{}'",
                url.scheme()
            )));
        }

        if self.api_key.is_empty() {
            return Err(IssuerError::ConfigError("API key must not be empty".to_string()));
        }
        if self.api_secret.is_empty() {
            return Err(IssuerError::ConfigError(
                "API secret must not be empty".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(IssuerError::ConfigError(
                "request timeout must be greater than zero".to_string(),
            ));
        }

        let certificate = parse_certificate(&self.client_cert_der)?;
        let spki = &certificate.tbs_certificate.subject_public_key_info;
        if !self.client_key.matches_public_key(spki)? {
            return Err(IssuerError::ConfigError(
                "mTLS client certificate does not match the private key".to_string(),
            ));
        }

        self.tls_config()?;
        Ok(())
    }

    /// Build the rustls configuration for this session.
    pub fn tls_config(&self) -> Result<TlsConfig> {
        build_mtls_config(
            self.client_cert_der.clone(),
            &self.client_key,
            &self.trust_anchors,
        )
    }
}
