//! TLS configuration for mTLS connections to the CA.
//!
//! Server certificates are verified against the bundled web PKI roots plus
//! any extra trust anchors supplied with the issuer credentials. The client
//! authenticates with the certificate and key from the credential secret.

use crate::crypto::ClientKey;
use crate::error::{IssuerError, Result};
use rustls::pki_types::CertificateDer;
use rustls::{ClientConfig, RootCertStore};
use std::sync::Arc;

/// TLS configuration for mTLS.
#[derive(Clone)]
pub struct TlsConfig {
    /// Rustls client configuration
    pub client_config: Arc<ClientConfig>,
}

/// Build a TLS configuration from a DER client certificate and its key.
///
/// # Arguments
///
/// * `client_cert_der` - Client certificate in DER format
/// * `client_key` - The matching private key
/// * `extra_roots_der` - Additional trusted CA certificates in DER format
///
/// # Example
///
/// ```rust,no_run
/// use atlas_issuer::cert::loader::load_certificate_from_pem;
/// use atlas_issuer::crypto::ClientKey;
/// use atlas_issuer::net::config::build_mtls_config;
///
/// # fn example() -> atlas_issuer::error::Result<()> {
/// let cert = load_certificate_from_pem(&std::fs::read("client.pem")?)?;
/// let key = ClientKey::from_pem(&std::fs::read("client-key.pem")?)?;
/// let config = build_mtls_config(cert, &key, &[])?;
/// # Ok(())
/// # }
/// ```
pub fn build_mtls_config(
    client_cert_der: Vec<u8>,
    client_key: &ClientKey,
    extra_roots_der: &[Vec<u8>],
) -> Result<TlsConfig> {
    let mut root_store = RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    for ca_der in extra_roots_der {
        root_store
            .add(CertificateDer::from(ca_der.clone()))
            .map_err(|e| IssuerError::ConfigError(format!("Failed to add CA cert: {:?}", e)))?;
    }

    // Install default crypto provider if not already set
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_client_auth_cert(
            vec![CertificateDer::from(client_cert_der)],
            client_key.to_private_key_der(),
        )
        .map_err(|e| IssuerError::ConfigError(format!("Failed to build client config: {}", e)))?;

    Ok(TlsConfig {
        client_config: Arc::new(config),
    })
}
