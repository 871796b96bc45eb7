//! Certificate issuance.
//!
//! [`HvcaSigner`] runs the issuance protocol for one CSR at a time:
//!
//! 1. open a CA session
//! 2. parse the CSR
//! 3. fetch the validation policy
//! 4. validate the CSR and build the request ([`project::build_request`])
//! 5. submit the request
//! 6. retrieve the issued certificate
//! 7. retrieve the trust chain
//! 8. encode leaf and chain as PEM
//!
//! Every step returns a [`Result`]; the first failure ends the call and no
//! partial output is produced. Each call runs under its own cancellation
//! scope, released on every exit path.
//!
//! # Example
//!
//! ```rust,no_run
//! use atlas_issuer::config::{IssuerSpec, SecretData};
//! use atlas_issuer::signer::HvcaSigner;
//! use std::path::Path;
//!
//! # async fn example() -> atlas_issuer::error::Result<()> {
//! let spec = IssuerSpec::new("https://emea.api.hvca.globalsign.com:8443/v2");
//! let secret = SecretData::from_dir(Path::new("/var/run/secrets/hvca"))?;
//! let signer = HvcaSigner::from_issuer_and_secret(&spec, &secret)?;
//!
//! let csr = std::fs::read("request.csr")?;
//! let issued = signer.sign(&csr).await?;
//! std::fs::write("tls.crt", &issued.certificate_pem)?;
//! std::fs::write("ca.crt", &issued.chain_pem)?;
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod project;

use crate::ca::client::{CaClient, CertificateStatus, Connect, HvcaConnector};
use crate::cert::csr::ParsedCsr;
use crate::cert::encode::{encode_certificate_pem, encode_chain_pem};
use crate::config::{ExpiryPolicy, IssuerSpec, RetrievalPolicy, SecretData};
use crate::error::{ErrorKind, IssuerError, Result};
use async_trait::async_trait;
use bootstrap::SessionConfig;
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Output of a successful issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCertificate {
    /// Leaf certificate as a single PEM block
    pub certificate_pem: Vec<u8>,
    /// CA chain as concatenated PEM blocks, issuing CA first
    pub chain_pem: Vec<u8>,
}

impl IssuedCertificate {
    /// Split into `(certificate_pem, chain_pem)`.
    pub fn into_parts(self) -> (Vec<u8>, Vec<u8>) {
        (self.certificate_pem, self.chain_pem)
    }
}

/// Signs certificate signing requests.
#[async_trait]
pub trait CertificateSigner: Send + Sync {
    /// Issue a certificate for `csr` (PEM or DER).
    async fn sign(&self, csr: &[u8]) -> Result<IssuedCertificate>;
}

/// Reports whether an issuer is usable.
pub trait HealthChecker: Send + Sync {
    /// Check issuer health without side effects.
    fn check(&self) -> Result<()>;
}

/// Constructs a signer from issuer configuration and credentials.
pub type SignerBuilder = fn(&IssuerSpec, &SecretData) -> Result<Box<dyn CertificateSigner>>;

/// Constructs a health checker from issuer configuration and credentials.
pub type HealthCheckerBuilder = fn(&IssuerSpec, &SecretData) -> Result<Box<dyn HealthChecker>>;

/// Default [`SignerBuilder`] for HVCA issuers.
pub fn hvca_signer_from_issuer_and_secret_data(
    spec: &IssuerSpec,
    secret: &SecretData,
) -> Result<Box<dyn CertificateSigner>> {
    Ok(Box::new(HvcaSigner::from_issuer_and_secret(spec, secret)?))
}

/// Default [`HealthCheckerBuilder`] for HVCA issuers.
///
/// No credentials are needed, so none are read.
pub fn hvca_health_checker_from_issuer_and_secret_data(
    _spec: &IssuerSpec,
    _secret: &SecretData,
) -> Result<Box<dyn HealthChecker>> {
    Ok(Box::new(StaticHealth))
}

/// Health checker for the credential-free builder path.
struct StaticHealth;

impl HealthChecker for StaticHealth {
    fn check(&self) -> Result<()> {
        Ok(())
    }
}

/// Issues certificates through an HVCA account.
///
/// The connector is generic so that tests can script the CA.
pub struct HvcaSigner<C: Connect = HvcaConnector> {
    session: Arc<SessionConfig>,
    connector: C,
    expiry: ExpiryPolicy,
    retrieval: RetrievalPolicy,
}

impl HvcaSigner<HvcaConnector> {
    /// Bootstrap a signer from issuer configuration and credentials.
    pub fn from_issuer_and_secret(spec: &IssuerSpec, secret: &SecretData) -> Result<Self> {
        let session = SessionConfig::from_issuer_and_secret(spec, secret)?;
        Ok(Self::with_connector(session, HvcaConnector, spec))
    }
}

impl<C: Connect> HvcaSigner<C> {
    /// Create a signer over an already validated session configuration.
    pub fn with_connector(session: SessionConfig, connector: C, spec: &IssuerSpec) -> Self {
        Self {
            session: Arc::new(session),
            connector,
            expiry: spec.expiry,
            retrieval: spec.retrieval,
        }
    }

    /// Session configuration used for every call.
    pub fn session(&self) -> &SessionConfig {
        &self.session
    }

    /// Issue a certificate for `csr`.
    pub async fn sign(&self, csr: &[u8]) -> Result<IssuedCertificate> {
        self.sign_with_cancellation(csr, &CancellationToken::new())
            .await
    }

    /// Issue a certificate for `csr`, aborting when `cancel` fires.
    ///
    /// Cancellation drops any in-flight CA request and returns
    /// [`IssuerError::CancelledError`].
    pub async fn sign_with_cancellation(
        &self,
        csr: &[u8],
        cancel: &CancellationToken,
    ) -> Result<IssuedCertificate> {
        let scope = cancel.child_token();
        let _release = scope.clone().drop_guard();

        let span = info_span!("sign", url = %self.session.url);
        let result = tokio::select! {
            biased;
            _ = scope.cancelled() => Err(IssuerError::CancelledError),
            result = self.issue(csr).instrument(span.clone()) => result,
        };

        if let Err(err) = &result {
            span.in_scope(|| match err.kind() {
                ErrorKind::PolicyValidation | ErrorKind::Unsupported => {
                    warn!(error = %err, "CSR rejected by CA validation policy")
                }
                _ => warn!(error = %err, "certificate issuance failed"),
            });
        }
        result
    }

    async fn issue(&self, csr: &[u8]) -> Result<IssuedCertificate> {
        let client = self.connector.connect(&self.session).await?;
        debug!("CA session opened");

        let csr = ParsedCsr::from_bytes(csr)?;
        debug!(common_name = %csr.common_name, dns_names = csr.dns_names.len(), "CSR parsed");

        let policy = client.policy().await?;
        debug!(key_type = %policy.public_key.key_type, "validation policy fetched");

        let request = project::build_request(&csr, &policy, self.expiry, Utc::now())?;

        let serial = client.submit(&request).await?;
        debug!(serial = %serial, "certificate request submitted");

        let certificate_der = self.retrieve_issued(&client, &serial).await?;

        let chain = client.trust_chain().await?;
        debug!(chain_length = chain.len(), "trust chain retrieved");

        info!(serial = %serial, "certificate issued");
        Ok(IssuedCertificate {
            certificate_pem: encode_certificate_pem(&certificate_der),
            chain_pem: encode_chain_pem(&chain),
        })
    }

    async fn retrieve_issued(&self, client: &C::Client, serial: &str) -> Result<Vec<u8>> {
        const OPERATION: &str = "retrieve certificate";

        let attempts = self.retrieval.attempts.max(1);
        for attempt in 1..=attempts {
            let info = client.retrieve(serial).await?;
            match (info.status, info.certificate_der) {
                (CertificateStatus::Issued, Some(der)) => return Ok(der),
                (CertificateStatus::Revoked, _) => {
                    return Err(IssuerError::RemoteError {
                        operation: OPERATION,
                        status: 200,
                        message: format!("certificate {} was revoked", serial),
                    })
                }
                _ if attempt < attempts => {
                    debug!(serial = %serial, attempt, "certificate not issued yet, waiting");
                    tokio::time::sleep(self.retrieval.interval()).await;
                }
                _ => {}
            }
        }

        Err(IssuerError::RemoteError {
            operation: OPERATION,
            status: 200,
            message: format!(
                "certificate {} was not issued after {} attempt(s)",
                serial, attempts
            ),
        })
    }
}

#[async_trait]
impl<C: Connect> CertificateSigner for HvcaSigner<C> {
    async fn sign(&self, csr: &[u8]) -> Result<IssuedCertificate> {
        self.sign_with_cancellation(csr, &CancellationToken::new())
            .await
    }
}

impl<C: Connect> HealthChecker for HvcaSigner<C> {
    fn check(&self) -> Result<()> {
        Ok(())
    }
}
