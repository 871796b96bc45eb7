//! mTLS HTTP client.
//!
//! A thin wrapper over the hyper legacy client with a rustls connector.
//! Every request is bounded by the configured timeout, which covers both the
//! exchange and reading the response body.

use crate::error::{IssuerError, Result};
use crate::net::config::TlsConfig;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Uri};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::str::FromStr;
use std::time::Duration;

/// HTTP method enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET method
    Get,
    /// POST method
    Post,
}

impl HttpMethod {
    /// Convert to HTTP method string.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// HTTP response structure.
#[derive(Debug)]
pub struct HttpResponse {
    /// HTTP status code
    pub status_code: u16,
    /// Response headers
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Whether the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// First value of the named header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Reusable HTTP client presenting the configured client certificate.
///
/// Cloning is cheap and clones share the connection pool.
#[derive(Clone)]
pub struct HttpClient {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    timeout: Duration,
}

impl HttpClient {
    /// Create a client from a TLS configuration.
    ///
    /// Plain `http` URLs are passed through without TLS; restricting the CA
    /// endpoint to `https` is left to configuration validation.
    pub fn new(config: &TlsConfig, timeout: Duration) -> Self {
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config((*config.client_config).clone())
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();

        let client = Client::builder(TokioExecutor::new()).build(https);

        Self { client, timeout }
    }

    /// Perform a request.
    ///
    /// # Arguments
    ///
    /// * `method` - The HTTP method
    /// * `url` - The URL to request
    /// * `headers` - Extra request headers
    /// * `body` - Optional request body
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use atlas_issuer::net::client::{HttpClient, HttpMethod};
    /// use atlas_issuer::net::config::TlsConfig;
    /// use std::time::Duration;
    ///
    /// # async fn example(config: TlsConfig) -> atlas_issuer::error::Result<()> {
    /// let client = HttpClient::new(&config, Duration::from_secs(30));
    /// let response = client
    ///     .request(HttpMethod::Get, "https://emea.api.hvca.globalsign.com:8443/v2/trustchain", &[], None)
    ///     .await?;
    /// println!("Status: {}", response.status_code);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse> {
        let uri = Uri::from_str(url)
            .map_err(|e| IssuerError::ConfigError(format!("Invalid URL: {}", e)))?;

        let mut builder = Request::builder().uri(uri).method(method.as_str());
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let req = builder
            .body(Full::new(Bytes::from(body.unwrap_or_default())))
            .map_err(|e| IssuerError::NetworkError(format!("Failed to build request: {}", e)))?;

        tokio::time::timeout(self.timeout, self.send(req))
            .await
            .map_err(|_| {
                IssuerError::NetworkError(format!(
                    "Request to {} timed out after {:?}",
                    url, self.timeout
                ))
            })?
    }

    async fn send(&self, req: Request<Full<Bytes>>) -> Result<HttpResponse> {
        let res = self
            .client
            .request(req)
            .await
            .map_err(|e| IssuerError::NetworkError(format!("Request failed: {}", e)))?;

        let status_code = res.status().as_u16();

        let headers: Vec<(String, String)> = res
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("<binary>").to_string()))
            .collect();

        let body = res
            .into_body()
            .collect()
            .await
            .map_err(|e| IssuerError::NetworkError(format!("Failed to read response body: {}", e)))?
            .to_bytes()
            .to_vec();

        Ok(HttpResponse {
            status_code,
            headers,
            body,
        })
    }
}
