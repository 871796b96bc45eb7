//! Certificate loading from PEM.
//!
//! PEM blocks are read with `rustls-pemfile` and the DER payload is checked
//! to be a well-formed X.509 certificate before it is handed on.

use crate::error::{IssuerError, Result};
use der::Decode;
use rustls_pemfile::Item;
use std::io::Cursor;
use x509_cert::Certificate;

/// Load the first certificate from PEM input and return its DER bytes.
///
/// Non-certificate blocks before the first certificate are an error.
///
/// # Example
///
/// ```rust,no_run
/// use atlas_issuer::cert::loader::load_certificate_from_pem;
///
/// # fn example() -> atlas_issuer::error::Result<()> {
/// let pem = std::fs::read("client.pem")?;
/// let der = load_certificate_from_pem(&pem)?;
/// # Ok(())
/// # }
/// ```
pub fn load_certificate_from_pem(pem: &[u8]) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(pem);

    match rustls_pemfile::read_one(&mut cursor)
        .map_err(|e| IssuerError::PemError(format!("Failed to read PEM: {}", e)))?
    {
        Some(Item::X509Certificate(cert_der)) => {
            let der = cert_der.to_vec();
            parse_certificate(&der)?;
            Ok(der)
        }
        Some(_) => Err(IssuerError::PemError(
            "PEM input does not contain a certificate".to_string(),
        )),
        None => Err(IssuerError::PemError("Empty PEM input".to_string())),
    }
}

/// Load every certificate from PEM input, preserving order.
///
/// Blocks of other types are skipped. At least one certificate is required.
pub fn load_certificates_from_pem(pem: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut cursor = Cursor::new(pem);
    let mut certificates = Vec::new();

    loop {
        match rustls_pemfile::read_one(&mut cursor)
            .map_err(|e| IssuerError::PemError(format!("Failed to read PEM: {}", e)))?
        {
            Some(Item::X509Certificate(cert_der)) => {
                let der = cert_der.to_vec();
                parse_certificate(&der)?;
                certificates.push(der);
            }
            Some(_) => continue,
            None => break,
        }
    }

    if certificates.is_empty() {
        return Err(IssuerError::PemError(
            "No certificates found in PEM input".to_string(),
        ));
    }

    Ok(certificates)
}

/// Decode DER bytes as an X.509 certificate.
pub fn parse_certificate(der: &[u8]) -> Result<Certificate> {
    Certificate::from_der(der)
        .map_err(|e| IssuerError::PemError(format!("Failed to decode certificate: {}", e)))
}
