//! PKCS#10 certificate signing request parsing.
//!
//! Input is accepted as PEM (`CERTIFICATE REQUEST` or the legacy
//! `NEW CERTIFICATE REQUEST` label) when it starts with an armour line, and
//! as raw DER otherwise.

use crate::crypto::KeyAlgorithm;
use crate::error::{IssuerError, Result};
use const_oid::db::rfc4519;
use const_oid::ObjectIdentifier;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use x509_parser::certification_request::X509CertificationRequest;
use x509_parser::extensions::{GeneralName, ParsedExtension};
use x509_parser::prelude::FromDer;
use x509_parser::x509::X509Name;

const CSR_PEM_LABELS: [&str; 2] = ["CERTIFICATE REQUEST", "NEW CERTIFICATE REQUEST"];

/// The fields of a CSR the issuer cares about.
///
/// Empty strings stand for absent subject attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCsr {
    /// Subject common name
    pub common_name: String,
    /// Subject serial number attribute
    pub serial_number: String,
    /// DNS-name subject alternative names, in CSR order
    pub dns_names: Vec<String>,
    /// IP-address subject alternative names, in CSR order
    pub ip_addresses: Vec<IpAddr>,
    /// Algorithm of the requested public key
    pub public_key_algorithm: KeyAlgorithm,
    pub(crate) der: Vec<u8>,
}

impl ParsedCsr {
    /// Parse a CSR from PEM or DER bytes.
    pub fn from_bytes(input: &[u8]) -> Result<Self> {
        if looks_like_pem(input) {
            let block = pem::parse(input).map_err(|e| {
                IssuerError::CsrParseError(format!("Failed to decode CSR PEM: {}", e))
            })?;
            if !CSR_PEM_LABELS.contains(&block.tag()) {
                return Err(IssuerError::CsrParseError(format!(
                    "Expected CERTIFICATE REQUEST, got {}",
                    block.tag()
                )));
            }
            Self::from_der(block.into_contents())
        } else {
            Self::from_der(input.to_vec())
        }
    }

    /// Parse a DER-encoded CSR.
    pub fn from_der(der: Vec<u8>) -> Result<Self> {
        let (rest, csr) = X509CertificationRequest::from_der(&der)
            .map_err(|e| IssuerError::CsrParseError(format!("Failed to parse CSR: {}", e)))?;
        if !rest.is_empty() {
            return Err(IssuerError::CsrParseError(
                "Trailing data after CSR".to_string(),
            ));
        }

        let info = &csr.certification_request_info;
        let common_name = subject_attribute(&info.subject, rfc4519::CN)?;
        let serial_number = subject_attribute(&info.subject, rfc4519::SERIAL_NUMBER)?;
        let public_key_algorithm =
            KeyAlgorithm::from_dotted(&info.subject_pki.algorithm.algorithm.to_id_string());

        let mut dns_names = Vec::new();
        let mut ip_addresses = Vec::new();
        if let Some(extensions) = csr.requested_extensions() {
            for ext in extensions {
                if let ParsedExtension::SubjectAlternativeName(san) = ext {
                    for name in &san.general_names {
                        match name {
                            GeneralName::DNSName(dns) => dns_names.push(dns.to_string()),
                            GeneralName::IPAddress(bytes) => {
                                ip_addresses.push(ip_from_bytes(bytes)?)
                            }
                            _ => {}
                        }
                    }
                }
            }
        }

        Ok(Self {
            common_name,
            serial_number,
            dns_names,
            ip_addresses,
            public_key_algorithm,
            der,
        })
    }

    /// DER encoding of the CSR as received.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// PEM encoding of the CSR, as sent to the CA.
    pub fn to_pem(&self) -> String {
        crate::cert::encode::encode_pem("CERTIFICATE REQUEST", &self.der)
    }
}

fn looks_like_pem(input: &[u8]) -> bool {
    let start = input
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(input.len());
    input[start..].starts_with(b"-----BEGIN")
}

fn subject_attribute(subject: &X509Name<'_>, oid: ObjectIdentifier) -> Result<String> {
    let oid = oid.to_string();
    for attr in subject.iter_attributes() {
        if attr.attr_type().to_id_string() == oid {
            let value = attr.as_str().map_err(|e| {
                IssuerError::CsrParseError(format!("Invalid subject attribute {}: {}", oid, e))
            })?;
            return Ok(value.to_string());
        }
    }
    Ok(String::new())
}

fn ip_from_bytes(bytes: &[u8]) -> Result<IpAddr> {
    if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
        return Ok(IpAddr::V4(Ipv4Addr::from(octets)));
    }
    if let Ok(octets) = <[u8; 16]>::try_from(bytes) {
        return Ok(IpAddr::V6(Ipv6Addr::from(octets)));
    }
    Err(IssuerError::CsrParseError(format!(
        "Invalid IP address SAN of {} bytes",
        bytes.len()
    )))
}
