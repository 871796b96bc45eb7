//! Certificate and CSR handling.
//!
//! This module parses the inbound CSR, loads PEM certificates, and re-encodes
//! issued certificates for output.

pub mod csr;
pub mod encode;
pub mod loader;
