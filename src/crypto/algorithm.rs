//! Public key algorithm identification.

use const_oid::db::{rfc5912, rfc8410};
use const_oid::ObjectIdentifier;
use std::fmt;

/// Public key algorithm of a CSR or client key.
///
/// The display names are the ones the CA uses in its validation policy
/// (`RSA`, `ECDSA`, ...), so policy comparison is a plain string match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    /// RSA (rsaEncryption)
    Rsa,
    /// DSA
    Dsa,
    /// Elliptic curve (id-ecPublicKey)
    Ecdsa,
    /// Ed25519
    Ed25519,
    /// Any other algorithm, identified by dotted OID
    Unknown(String),
}

impl KeyAlgorithm {
    /// Identify an algorithm from its object identifier.
    pub fn from_oid(oid: ObjectIdentifier) -> Self {
        if oid == rfc5912::RSA_ENCRYPTION {
            KeyAlgorithm::Rsa
        } else if oid == rfc5912::ID_DSA {
            KeyAlgorithm::Dsa
        } else if oid == rfc5912::ID_EC_PUBLIC_KEY {
            KeyAlgorithm::Ecdsa
        } else if oid == rfc8410::ID_ED_25519 {
            KeyAlgorithm::Ed25519
        } else {
            KeyAlgorithm::Unknown(oid.to_string())
        }
    }

    /// Identify an algorithm from a dotted OID string.
    pub fn from_dotted(oid: &str) -> Self {
        match ObjectIdentifier::new(oid) {
            Ok(oid) => Self::from_oid(oid),
            Err(_) => KeyAlgorithm::Unknown(oid.to_string()),
        }
    }

    /// Name as used by the CA policy.
    pub fn as_str(&self) -> &str {
        match self {
            KeyAlgorithm::Rsa => "RSA",
            KeyAlgorithm::Dsa => "DSA",
            KeyAlgorithm::Ecdsa => "ECDSA",
            KeyAlgorithm::Ed25519 => "Ed25519",
            KeyAlgorithm::Unknown(oid) => oid,
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
