//! Transport to the CA: rustls mTLS configuration and the HTTP client.

pub mod client;
pub mod config;
