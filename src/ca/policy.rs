//! The CA account's validation policy.
//!
//! The policy is fetched fresh for every issuance and decides which request
//! fields may be sent, which are mandatory, and how many SAN entries are
//! accepted. Unknown JSON fields are ignored and missing sections default to
//! the most restrictive reading (forbidden, zero entries).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Presence rule for a request field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Presence {
    /// The field must not be sent
    #[default]
    Forbidden,
    /// The field may be sent
    Optional,
    /// The field must be sent
    Required,
    /// The CA fills the field itself
    Static,
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Presence::Forbidden => "FORBIDDEN",
            Presence::Optional => "OPTIONAL",
            Presence::Required => "REQUIRED",
            Presence::Static => "STATIC",
        };
        f.write_str(name)
    }
}

/// Rule for a single-valued subject field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FieldPolicy {
    /// Presence rule
    #[serde(default)]
    pub presence: Presence,
    /// Regular expression the CA applies to the value, informational here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Subject distinguished name rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SubjectDnPolicy {
    /// Common name rule
    #[serde(default)]
    pub common_name: FieldPolicy,
    /// Subject serial number rule
    #[serde(default)]
    pub serial_number: FieldPolicy,
}

/// Rule for a multi-valued SAN field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ListPolicy {
    /// The CA fills the values itself; client values are never sent
    #[serde(rename = "static", default)]
    pub is_static: bool,
    /// Permitted value patterns
    #[serde(default)]
    pub list: Vec<String>,
    /// Minimum number of entries
    #[serde(rename = "mincount", default)]
    pub min_count: usize,
    /// Maximum number of entries
    #[serde(rename = "maxcount", default)]
    pub max_count: usize,
}

impl ListPolicy {
    /// Whether client-supplied values may be sent at all.
    pub fn accepts_client_values(&self) -> bool {
        !self.is_static && self.max_count > 0
    }
}

/// Subject alternative name rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SanPolicy {
    /// DNS name rule
    #[serde(default)]
    pub dns_names: ListPolicy,
    /// IP address rule
    #[serde(default)]
    pub ip_addresses: ListPolicy,
}

/// Key encoding the CA expects in submitted requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyFormat {
    /// Bare public key
    #[serde(rename = "PKCS8")]
    Pkcs8,
    /// Certificate signing request
    #[serde(rename = "PKCS10")]
    Pkcs10,
    /// Any format this client does not know about
    #[serde(other)]
    Other,
}

impl fmt::Display for KeyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyFormat::Pkcs8 => "PKCS8",
            KeyFormat::Pkcs10 => "PKCS10",
            KeyFormat::Other => "unknown",
        };
        f.write_str(name)
    }
}

/// Public key rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyPolicy {
    /// Required key algorithm name, e.g. `RSA` or `ECDSA`
    pub key_type: String,
    /// Permitted key sizes in bits
    #[serde(default)]
    pub allowed_lengths: Vec<u32>,
    /// Required key encoding
    pub key_format: KeyFormat,
}

/// Rule for a choice among named algorithms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AlgorithmPolicy {
    /// Presence rule
    #[serde(default)]
    pub presence: Presence,
    /// Acceptable algorithms in CA preference order
    #[serde(default)]
    pub list: Vec<String>,
}

/// Signature rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SignaturePolicy {
    /// Signature algorithm rule
    #[serde(default)]
    pub algorithm: AlgorithmPolicy,
    /// Hash algorithm rule
    #[serde(default)]
    pub hash_algorithm: AlgorithmPolicy,
}

/// Validity period rules, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ValidityPolicy {
    /// Shortest permitted lifetime
    #[serde(default)]
    pub secondsmin: u64,
    /// Longest permitted lifetime
    #[serde(default)]
    pub secondsmax: u64,
    /// Tolerated not-before skew into the past
    #[serde(default)]
    pub not_before_negative_skew: u64,
    /// Tolerated not-before skew into the future
    #[serde(default)]
    pub not_before_positive_skew: u64,
}

impl ValidityPolicy {
    /// Whether a lifetime of `seconds` falls inside the declared range.
    ///
    /// A zero maximum means the CA declared no upper bound.
    pub fn permits(&self, seconds: u64) -> bool {
        seconds >= self.secondsmin && (self.secondsmax == 0 || seconds <= self.secondsmax)
    }
}

/// The CA account's validation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    /// Validity rules, when the CA declares them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity: Option<ValidityPolicy>,
    /// Subject DN rules
    #[serde(default)]
    pub subject_dn: SubjectDnPolicy,
    /// SAN rules
    #[serde(default)]
    pub san: SanPolicy,
    /// Public key rules
    pub public_key: PublicKeyPolicy,
    /// Signature rules
    #[serde(default)]
    pub signature: SignaturePolicy,
}
