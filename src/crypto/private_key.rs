//! mTLS client private key parsing.
//!
//! The client key arrives as a PEM block whose label declares its encoding.
//! The recognized encodings form a closed set ([`KeyEncoding`]); each has its
//! own binary parser, and any other label is rejected with
//! [`IssuerError::UnknownKeyTypeError`].

use crate::crypto::algorithm::KeyAlgorithm;
use crate::error::{IssuerError, Result};
use der::Encode;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey, PrivateKeyInfo};
use rsa::RsaPrivateKey;
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs1KeyDer, PrivatePkcs8KeyDer};
use spki::SubjectPublicKeyInfoOwned;
use std::fmt;

/// Recognized private key encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEncoding {
    /// PKCS#1 RSA private key (`RSA PRIVATE KEY`)
    Pkcs1,
    /// PKCS#8 private key info (`PRIVATE KEY`)
    Pkcs8,
}

impl KeyEncoding {
    /// Determine the encoding from a PEM label.
    pub fn from_pem_label(label: &str) -> Result<Self> {
        match label {
            "RSA PRIVATE KEY" => Ok(KeyEncoding::Pkcs1),
            "PRIVATE KEY" => Ok(KeyEncoding::Pkcs8),
            _ => Err(IssuerError::UnknownKeyTypeError),
        }
    }

    /// PEM label for this encoding.
    pub fn pem_label(self) -> &'static str {
        match self {
            KeyEncoding::Pkcs1 => "RSA PRIVATE KEY",
            KeyEncoding::Pkcs8 => "PRIVATE KEY",
        }
    }

    fn parse(self, der: &[u8]) -> Result<KeyMaterial> {
        match self {
            KeyEncoding::Pkcs1 => {
                let key = RsaPrivateKey::from_pkcs1_der(der).map_err(|e| {
                    IssuerError::ConfigError(format!("Failed to parse PKCS#1 private key: {}", e))
                })?;
                Ok(KeyMaterial::Rsa(key))
            }
            KeyEncoding::Pkcs8 => {
                let info = PrivateKeyInfo::try_from(der).map_err(|e| {
                    IssuerError::ConfigError(format!("Failed to parse PKCS#8 private key: {}", e))
                })?;

                match KeyAlgorithm::from_oid(info.algorithm.oid) {
                    KeyAlgorithm::Rsa => {
                        let key = RsaPrivateKey::from_pkcs8_der(der).map_err(|e| {
                            IssuerError::ConfigError(format!(
                                "Failed to parse PKCS#8 RSA private key: {}",
                                e
                            ))
                        })?;
                        Ok(KeyMaterial::Rsa(key))
                    }
                    algorithm @ (KeyAlgorithm::Ecdsa | KeyAlgorithm::Ed25519) => {
                        Ok(KeyMaterial::Opaque(algorithm))
                    }
                    other => Err(IssuerError::ConfigError(format!(
                        "Unsupported PKCS#8 private key algorithm: {}",
                        other
                    ))),
                }
            }
        }
    }
}

enum KeyMaterial {
    Rsa(RsaPrivateKey),
    Opaque(KeyAlgorithm),
}

/// A parsed mTLS client private key.
pub struct ClientKey {
    encoding: KeyEncoding,
    material: KeyMaterial,
    der: Vec<u8>,
}

impl fmt::Debug for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientKey")
            .field("encoding", &self.encoding)
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}

impl ClientKey {
    /// Parse a PEM-encoded private key, dispatching on its label.
    pub fn from_pem(pem_bytes: &[u8]) -> Result<Self> {
        let block = pem::parse(pem_bytes).map_err(|e| {
            IssuerError::PemError(format!("Failed to parse mTLS private key PEM: {}", e))
        })?;

        let encoding = KeyEncoding::from_pem_label(block.tag())?;
        let der = block.into_contents();
        let material = encoding.parse(&der)?;

        Ok(Self {
            encoding,
            material,
            der,
        })
    }

    /// Declared encoding of the key.
    pub fn encoding(&self) -> KeyEncoding {
        self.encoding
    }

    /// Algorithm of the key.
    pub fn algorithm(&self) -> KeyAlgorithm {
        match &self.material {
            KeyMaterial::Rsa(_) => KeyAlgorithm::Rsa,
            KeyMaterial::Opaque(algorithm) => algorithm.clone(),
        }
    }

    /// The key in the form rustls expects for client authentication.
    pub fn to_private_key_der(&self) -> PrivateKeyDer<'static> {
        match self.encoding {
            KeyEncoding::Pkcs1 => PrivateKeyDer::Pkcs1(PrivatePkcs1KeyDer::from(self.der.clone())),
            KeyEncoding::Pkcs8 => PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.der.clone())),
        }
    }

    /// Check that `spki` is the public half of this key.
    ///
    /// RSA keys are compared on the full encoded public key; other
    /// algorithms only on the algorithm identifier.
    pub fn matches_public_key(&self, spki: &SubjectPublicKeyInfoOwned) -> Result<bool> {
        let cert_algorithm = KeyAlgorithm::from_oid(spki.algorithm.oid);
        if cert_algorithm != self.algorithm() {
            return Ok(false);
        }

        match &self.material {
            KeyMaterial::Rsa(key) => {
                let ours = key.to_public_key().to_public_key_der().map_err(|e| {
                    IssuerError::ConfigError(format!("Failed to encode RSA public key: {}", e))
                })?;
                let theirs = spki.to_der().map_err(|e| {
                    IssuerError::ConfigError(format!(
                        "Failed to encode certificate public key: {}",
                        e
                    ))
                })?;
                Ok(ours.as_bytes() == theirs.as_slice())
            }
            KeyMaterial::Opaque(_) => Ok(true),
        }
    }
}
