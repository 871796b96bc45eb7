//! The remote CA: its validation policy, the request body, and the client
//! that speaks the HVCA protocol.

pub mod client;
pub mod policy;
pub mod request;

pub use client::{CaClient, CertificateInfo, CertificateStatus, Connect, HvcaClient, HvcaConnector};
pub use policy::ValidationPolicy;
pub use request::CertificateRequest;
