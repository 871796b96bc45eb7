//! Atlas issuer: certificate issuance through a remote HVCA certificate
//! authority.
//!
//! Given a PKCS#10 CSR and an HVCA account reachable over mutual TLS, the
//! library produces the signed leaf certificate and the CA trust chain as
//! PEM, or fails with an error describing which step went wrong.
//!
//! # Architecture
//!
//! - [`signer::bootstrap`] turns an issuer specification and a credential
//!   secret into a validated [`signer::bootstrap::SessionConfig`].
//! - [`signer::HvcaSigner`] runs the issuance protocol for each CSR: fetch
//!   the validation policy, project the CSR onto a request, submit, retrieve
//!   and encode.
//! - [`ca`] holds the policy and request shapes and the HVCA HTTP client;
//!   [`net`] provides the rustls/hyper transport underneath it.
//!
//! All operations return [`Result`]; errors carry an [`error::ErrorKind`]
//! for callers deciding whether to retry.
//!
//! # Example
//!
//! ```rust,no_run
//! use atlas_issuer::config::{IssuerSpec, SecretData};
//! use atlas_issuer::signer::HvcaSigner;
//! use std::path::Path;
//!
//! # async fn example() -> atlas_issuer::Result<()> {
//! let spec = IssuerSpec::from_file(Path::new("issuer.json"))?;
//! let secret = SecretData::from_dir(Path::new("/var/run/secrets/hvca"))?;
//! let signer = HvcaSigner::from_issuer_and_secret(&spec, &secret)?;
//!
//! let (leaf, chain) = signer.sign(&std::fs::read("request.csr")?).await?.into_parts();
//! # Ok(())
//! # }
//! ```

pub mod ca;
pub mod cert;
pub mod config;
pub mod crypto;
pub mod error;
pub mod net;
pub mod signer;

// Re-export commonly used types
pub use error::{ErrorKind, IssuerError, Result};
pub use signer::{CertificateSigner, HealthChecker, HvcaSigner, IssuedCertificate};
