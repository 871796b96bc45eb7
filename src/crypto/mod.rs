//! Key material handling.
//!
//! This module covers the mTLS client private key accepted by the
//! bootstrapper and the naming of public key algorithms shared by keys and
//! CSRs.
//!
//! # Example
//!
//! ```rust,no_run
//! use atlas_issuer::crypto::private_key::{ClientKey, KeyEncoding};
//!
//! # fn example() -> atlas_issuer::error::Result<()> {
//! let pem = std::fs::read("client-key.pem")?;
//! let key = ClientKey::from_pem(&pem)?;
//! assert!(matches!(key.encoding(), KeyEncoding::Pkcs1 | KeyEncoding::Pkcs8));
//! # Ok(())
//! # }
//! ```

pub mod algorithm;
pub mod private_key;

pub use algorithm::KeyAlgorithm;
pub use private_key::{ClientKey, KeyEncoding};
