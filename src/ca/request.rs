//! Outbound certificate request body.

use serde::Serialize;
use std::net::IpAddr;

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

/// Subject distinguished name fields sent to the CA.
///
/// `None` means the policy does not allow the field. An allowed but empty
/// value is kept here and omitted on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct SubjectDn {
    /// Common name
    #[serde(skip_serializing_if = "is_blank")]
    pub common_name: Option<String>,
    /// Subject serial number
    #[serde(skip_serializing_if = "is_blank")]
    pub serial_number: Option<String>,
}

/// Subject alternative names sent to the CA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct San {
    /// DNS names
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns_names: Vec<String>,
    /// IP addresses
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ip_addresses: Vec<IpAddr>,
}

impl San {
    /// Whether no SAN of any type is present.
    pub fn is_empty(&self) -> bool {
        self.dns_names.is_empty() && self.ip_addresses.is_empty()
    }
}

/// Requested validity window as Unix timestamps.
///
/// A `not_after` of zero asks the CA for the longest validity its policy
/// allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Validity {
    /// Start of validity
    pub not_before: i64,
    /// End of validity, or `0` for CA-assigned
    pub not_after: i64,
}

/// Signature parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureRequest {
    /// Hash algorithm name as listed by the CA policy
    pub hash_algorithm: String,
}

/// A certificate request ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateRequest {
    /// Validity window
    pub validity: Validity,
    /// Subject DN
    pub subject_dn: SubjectDn,
    /// Subject alternative names
    #[serde(skip_serializing_if = "San::is_empty")]
    pub san: San,
    /// Signature parameters, when the policy requires a hash algorithm
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignatureRequest>,
    /// The CSR in PEM form, sent as the request's public key
    #[serde(rename = "public_key")]
    pub csr: String,
}
