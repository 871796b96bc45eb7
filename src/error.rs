//! Error types for the issuer.
//!
//! Every fallible operation returns an [`IssuerError`] scoped to the call.
//! Errors are grouped into a small set of kinds (see [`ErrorKind`]) so that a
//! caller driving reconciliation can decide whether a failure is worth
//! retrying without inspecting messages.

use thiserror::Error;

/// The main error type for issuance operations.
#[derive(Error, Debug)]
pub enum IssuerError {
    /// Malformed issuer configuration or credentials
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The mTLS private key PEM label is not a recognized encoding
    #[error("unable to determine the mTLS private key type")]
    UnknownKeyTypeError,

    /// PEM encoding/decoding error
    #[error("PEM error: {0}")]
    PemError(String),

    /// The certificate signing request could not be parsed
    #[error("CSR parse error: {0}")]
    CsrParseError(String),

    /// The CSR does not satisfy the CA validation policy
    #[error("Policy validation error: {0}")]
    PolicyError(String),

    /// The CA account requires something this client never produces
    #[error("Unsupported configuration: {0}")]
    UnsupportedError(String),

    /// The CA answered with a non-success status
    #[error("CA request '{operation}' failed with status {status}: {message}")]
    RemoteError {
        /// Protocol step that failed
        operation: &'static str,
        /// HTTP status code returned by the CA
        status: u16,
        /// Description returned by the CA, or the raw body
        message: String,
    },

    /// Transport level failure talking to the CA
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The governing scope was cancelled before the call completed
    #[error("Operation cancelled")]
    CancelledError,

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Local I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Coarse classification of an [`IssuerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credentials or issuer settings are unusable
    Configuration,
    /// The CSR input is malformed
    Parse,
    /// The CSR does not satisfy the fetched policy
    PolicyValidation,
    /// The CA account needs a capability this client lacks
    Unsupported,
    /// A call to the CA failed
    Remote,
    /// The caller cancelled the operation
    Cancelled,
}

impl IssuerError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            IssuerError::ConfigError(_)
            | IssuerError::UnknownKeyTypeError
            | IssuerError::PemError(_)
            | IssuerError::IoError(_) => ErrorKind::Configuration,
            IssuerError::CsrParseError(_) => ErrorKind::Parse,
            IssuerError::PolicyError(_) => ErrorKind::PolicyValidation,
            IssuerError::UnsupportedError(_) => ErrorKind::Unsupported,
            IssuerError::RemoteError { .. }
            | IssuerError::NetworkError(_)
            | IssuerError::JsonError(_) => ErrorKind::Remote,
            IssuerError::CancelledError => ErrorKind::Cancelled,
        }
    }
}

/// A specialized Result type for issuance operations.
pub type Result<T> = std::result::Result<T, IssuerError>;
