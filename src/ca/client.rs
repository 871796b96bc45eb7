//! CA client: the remote half of the issuance protocol.
//!
//! [`CaClient`] is the seam between the orchestrator and the CA. The HVCA
//! implementation speaks JSON over mTLS; tests substitute scripted clients
//! through [`Connect`].

use crate::ca::policy::ValidationPolicy;
use crate::ca::request::CertificateRequest;
use crate::cert::loader::load_certificate_from_pem;
use crate::error::{IssuerError, Result};
use crate::net::client::{HttpClient, HttpMethod, HttpResponse};
use crate::signer::bootstrap::SessionConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Issuance status of a submitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateStatus {
    /// The certificate has been issued
    Issued,
    /// The certificate was revoked
    Revoked,
    /// Not issued yet
    #[serde(other)]
    Pending,
}

/// Result of a certificate retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    /// Issuance status
    pub status: CertificateStatus,
    /// The certificate in DER form, once issued
    pub certificate_der: Option<Vec<u8>>,
}

/// Operations of an authenticated CA session.
#[async_trait]
pub trait CaClient: Send + Sync {
    /// Fetch the account's validation policy.
    async fn policy(&self) -> Result<ValidationPolicy>;

    /// Submit a request and return the serial identifying it.
    async fn submit(&self, request: &CertificateRequest) -> Result<String>;

    /// Fetch the certificate for a serial.
    async fn retrieve(&self, serial: &str) -> Result<CertificateInfo>;

    /// Fetch the CA chain in DER form, issuing CA first.
    async fn trust_chain(&self) -> Result<Vec<Vec<u8>>>;
}

/// Opens authenticated CA sessions.
#[async_trait]
pub trait Connect: Send + Sync {
    /// The session type produced.
    type Client: CaClient;

    /// Open a session using `config`.
    async fn connect(&self, config: &SessionConfig) -> Result<Self::Client>;
}

/// Connector for the HVCA HTTP API.
#[derive(Debug, Clone, Copy, Default)]
pub struct HvcaConnector;

#[async_trait]
impl Connect for HvcaConnector {
    type Client = HvcaClient;

    async fn connect(&self, config: &SessionConfig) -> Result<HvcaClient> {
        let tls = config.tls_config()?;
        let http = HttpClient::new(&tls, config.request_timeout);
        HvcaClient::login(http, &config.url, &config.api_key, config.api_secret()).await
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    api_key: &'a str,
    api_secret: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct CertificateResponse {
    status: CertificateStatus,
    #[serde(default)]
    certificate: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    description: String,
}

/// An authenticated HVCA session.
pub struct HvcaClient {
    http: HttpClient,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for HvcaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HvcaClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HvcaClient {
    /// Log in with the account API credentials.
    ///
    /// # Arguments
    ///
    /// * `http` - mTLS HTTP client presenting the account's client certificate
    /// * `base_url` - Base URL of the HVCA API
    /// * `api_key` - Account API key
    /// * `api_secret` - Account API secret
    pub async fn login(
        http: HttpClient,
        base_url: &str,
        api_key: &str,
        api_secret: &str,
    ) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let body = serde_json::to_vec(&LoginRequest {
            api_key,
            api_secret,
        })?;

        debug!(url = %base_url, "logging in to CA");
        let response = http
            .request(
                HttpMethod::Post,
                &format!("{}/login", base_url),
                &[("Content-Type", "application/json;charset=utf-8")],
                Some(body),
            )
            .await?;
        let login: LoginResponse = parse_json("login", response)?;

        Ok(Self {
            http,
            base_url,
            token: login.access_token,
        })
    }

    async fn call(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse> {
        let authorization = format!("Bearer {}", self.token);
        let mut headers = vec![("Authorization", authorization.as_str())];
        if body.is_some() {
            headers.push(("Content-Type", "application/json;charset=utf-8"));
        }
        self.http
            .request(method, &format!("{}{}", self.base_url, path), &headers, body)
            .await
    }
}

#[async_trait]
impl CaClient for HvcaClient {
    async fn policy(&self) -> Result<ValidationPolicy> {
        let response = self.call(HttpMethod::Get, "/validationpolicy", None).await?;
        parse_json("fetch validation policy", response)
    }

    async fn submit(&self, request: &CertificateRequest) -> Result<String> {
        const OPERATION: &str = "submit certificate request";

        let body = serde_json::to_vec(request)?;
        let response = self.call(HttpMethod::Post, "/certificates", Some(body)).await?;
        let response = check_status(OPERATION, response)?;

        response
            .header("Location")
            .and_then(|location| location.trim_end_matches('/').rsplit('/').next())
            .filter(|serial| !serial.is_empty())
            .map(str::to_string)
            .ok_or_else(|| IssuerError::RemoteError {
                operation: OPERATION,
                status: response.status_code,
                message: "response has no Location header naming the serial".to_string(),
            })
    }

    async fn retrieve(&self, serial: &str) -> Result<CertificateInfo> {
        const OPERATION: &str = "retrieve certificate";

        let response = self
            .call(HttpMethod::Get, &format!("/certificates/{}", serial), None)
            .await?;
        let status = response.status_code;
        let body: CertificateResponse = parse_json(OPERATION, response)?;

        let certificate_der = match body.certificate.as_deref() {
            Some(pem) if !pem.trim().is_empty() => Some(
                load_certificate_from_pem(pem.as_bytes()).map_err(|e| {
                    IssuerError::RemoteError {
                        operation: OPERATION,
                        status,
                        message: e.to_string(),
                    }
                })?,
            ),
            _ => None,
        };

        Ok(CertificateInfo {
            status: body.status,
            certificate_der,
        })
    }

    async fn trust_chain(&self) -> Result<Vec<Vec<u8>>> {
        const OPERATION: &str = "retrieve trust chain";

        let response = self.call(HttpMethod::Get, "/trustchain", None).await?;
        let status = response.status_code;
        let chain: Vec<String> = parse_json(OPERATION, response)?;

        chain
            .iter()
            .map(|pem| {
                load_certificate_from_pem(pem.as_bytes()).map_err(|e| IssuerError::RemoteError {
                    operation: OPERATION,
                    status,
                    message: e.to_string(),
                })
            })
            .collect()
    }
}

fn check_status(operation: &'static str, response: HttpResponse) -> Result<HttpResponse> {
    if response.is_success() {
        return Ok(response);
    }

    let message = match serde_json::from_slice::<ErrorResponse>(&response.body) {
        Ok(error) => error.description,
        Err(_) => String::from_utf8_lossy(&response.body).trim().to_string(),
    };

    Err(IssuerError::RemoteError {
        operation,
        status: response.status_code,
        message,
    })
}

fn parse_json<T: serde::de::DeserializeOwned>(
    operation: &'static str,
    response: HttpResponse,
) -> Result<T> {
    let response = check_status(operation, response)?;
    serde_json::from_slice(&response.body).map_err(|e| IssuerError::RemoteError {
        operation,
        status: response.status_code,
        message: format!("Invalid response body: {}", e),
    })
}
