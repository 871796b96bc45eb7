//! Issuer configuration and secret material.

pub mod issuer;
pub mod secret;

pub use issuer::{ExpiryPolicy, IssuerSpec, RetrievalPolicy};
pub use secret::SecretData;
