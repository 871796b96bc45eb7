//! PEM re-encoding of issued certificates.
//!
//! The CA hands back DER certificates; the issuer returns them as PEM with
//! `\n` line endings. Chain certificates are concatenated in the order given.

use pem::{EncodeConfig, LineEnding, Pem};

/// PEM label for X.509 certificates.
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Encode `der` as a single PEM block with the given label.
pub fn encode_pem(label: &str, der: &[u8]) -> String {
    let block = Pem::new(label, der.to_vec());
    pem::encode_config(&block, EncodeConfig::new().set_line_ending(LineEnding::LF))
}

/// Encode a DER certificate as PEM bytes.
pub fn encode_certificate_pem(der: &[u8]) -> Vec<u8> {
    encode_pem(CERTIFICATE_LABEL, der).into_bytes()
}

/// Encode a chain of DER certificates as concatenated PEM blocks.
///
/// An empty chain yields an empty byte sequence.
pub fn encode_chain_pem(chain: &[Vec<u8>]) -> Vec<u8> {
    chain
        .iter()
        .flat_map(|der| encode_certificate_pem(der))
        .collect()
}
