//! HVCA wire protocol tests against a mock HTTP server.

use async_trait::async_trait;
use atlas_issuer::ca::client::{CaClient, CertificateStatus, Connect, HvcaClient};
use atlas_issuer::cert::loader::load_certificate_from_pem;
use atlas_issuer::config::secret::{API_KEY, API_SECRET, CLIENT_CERT, CLIENT_KEY};
use atlas_issuer::config::{IssuerSpec, SecretData};
use atlas_issuer::error::{IssuerError, Result};
use atlas_issuer::net::client::HttpClient;
use atlas_issuer::signer::bootstrap::SessionConfig;
use atlas_issuer::signer::HvcaSigner;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CLIENT_CERT_PEM: &str = include_str!("fixtures/client-cert.pem");
const CLIENT_KEY_PEM: &str = include_str!("fixtures/client-key-pkcs8.pem");
const LEAF_PEM: &str = include_str!("fixtures/leaf.pem");
const INTERMEDIATE_PEM: &str = include_str!("fixtures/intermediate-ca.pem");
const ROOT_PEM: &str = include_str!("fixtures/root-ca.pem");
const CSR_CN: &str = include_str!("fixtures/csr-rsa-cn.pem");

fn spec() -> IssuerSpec {
    IssuerSpec::new("https://ca.example.com/v2")
}

fn session() -> SessionConfig {
    let secret = SecretData::new()
        .with(API_KEY, "key-123")
        .with(API_SECRET, "secret-456")
        .with(CLIENT_CERT, CLIENT_CERT_PEM)
        .with(CLIENT_KEY, CLIENT_KEY_PEM);
    SessionConfig::from_issuer_and_secret(&spec(), &secret).unwrap()
}

fn http_client(session: &SessionConfig) -> HttpClient {
    HttpClient::new(&session.tls_config().unwrap(), Duration::from_secs(5))
}

fn policy_json() -> serde_json::Value {
    json!({
        "validity": {"secondsmin": 60, "secondsmax": 7776000},
        "subject_dn": {"common_name": {"presence": "REQUIRED", "format": ".*"}},
        "san": {
            "dns_names": {"static": false, "list": [".*"], "mincount": 0, "maxcount": 10},
            "ip_addresses": {"static": true, "list": [], "mincount": 0, "maxcount": 0}
        },
        "public_key": {"key_type": "RSA", "allowed_lengths": [2048], "key_format": "PKCS10"},
        "signature": {"hash_algorithm": {"presence": "REQUIRED", "list": ["SHA256"]}}
    })
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v2/login"))
        .and(body_json(json!({"api_key": "key-123", "api_secret": "secret-456"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok"})))
        .mount(server)
        .await;
}

async fn login(server: &MockServer) -> Result<HvcaClient> {
    let session = session();
    HvcaClient::login(
        http_client(&session),
        &format!("{}/v2/", server.uri()),
        &session.api_key,
        session.api_secret(),
    )
    .await
}

#[tokio::test]
async fn test_policy_uses_bearer_token() -> Result<()> {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/v2/validationpolicy"))
        .and(header("Authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(policy_json()))
        .expect(1)
        .mount(&server)
        .await;

    let client = login(&server).await?;
    let policy = client.policy().await?;
    assert_eq!(policy.public_key.key_type, "RSA");
    assert_eq!(policy.san.dns_names.max_count, 10);

    Ok(())
}

#[tokio::test]
async fn test_login_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/login"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"code": 401, "description": "Invalid credentials"})),
        )
        .mount(&server)
        .await;

    let err = login(&server).await.unwrap_err();
    match err {
        IssuerError::RemoteError {
            operation,
            status,
            message,
        } => {
            assert_eq!(operation, "login");
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid credentials");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_retrieve_and_trust_chain() -> Result<()> {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/v2/certificates/01AB"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "ISSUED", "certificate": LEAF_PEM})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/trustchain"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([INTERMEDIATE_PEM, ROOT_PEM])),
        )
        .mount(&server)
        .await;

    let client = login(&server).await?;

    let info = client.retrieve("01AB").await?;
    assert_eq!(info.status, CertificateStatus::Issued);
    assert_eq!(
        info.certificate_der.unwrap(),
        load_certificate_from_pem(LEAF_PEM.as_bytes())?
    );

    let chain = client.trust_chain().await?;
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0], load_certificate_from_pem(INTERMEDIATE_PEM.as_bytes())?);
    assert_eq!(chain[1], load_certificate_from_pem(ROOT_PEM.as_bytes())?);

    Ok(())
}

#[tokio::test]
async fn test_garbage_certificate_is_remote_error() -> Result<()> {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/v2/certificates/01AB"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "ISSUED", "certificate": "garbage"})),
        )
        .mount(&server)
        .await;

    let client = login(&server).await?;
    let err = client.retrieve("01AB").await.unwrap_err();
    assert!(matches!(err, IssuerError::RemoteError { .. }));

    Ok(())
}

/// Opens sessions against the mock server instead of the configured URL.
struct MockConnector {
    base_url: String,
}

#[async_trait]
impl Connect for MockConnector {
    type Client = HvcaClient;

    async fn connect(&self, config: &SessionConfig) -> Result<HvcaClient> {
        HvcaClient::login(
            http_client(config),
            &self.base_url,
            &config.api_key,
            config.api_secret(),
        )
        .await
    }
}

#[tokio::test]
async fn test_sign_over_http() -> Result<()> {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/v2/validationpolicy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(policy_json()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/certificates"))
        .and(header("Authorization", "Bearer tok"))
        .and(body_partial_json(json!({
            "subject_dn": {"common_name": "example.com"},
            "san": {"dns_names": ["example.com"]},
            "signature": {"hash_algorithm": "SHA256"},
            "validity": {"not_after": 0},
            "public_key": CSR_CN
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Location", format!("{}/v2/certificates/01AB", server.uri())),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/certificates/01AB"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "ISSUED", "certificate": LEAF_PEM})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/trustchain"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([INTERMEDIATE_PEM])))
        .mount(&server)
        .await;

    let connector = MockConnector {
        base_url: format!("{}/v2", server.uri()),
    };
    let signer = HvcaSigner::with_connector(session(), connector, &spec());
    let issued = signer.sign(CSR_CN.as_bytes()).await?;

    let leaf = pem::parse(&issued.certificate_pem).unwrap();
    assert_eq!(
        leaf.contents(),
        load_certificate_from_pem(LEAF_PEM.as_bytes())?.as_slice()
    );
    assert_eq!(pem::parse_many(&issued.chain_pem).unwrap().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_submit_without_location() -> Result<()> {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/v2/validationpolicy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(policy_json()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/certificates"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let connector = MockConnector {
        base_url: format!("{}/v2", server.uri()),
    };
    let signer = HvcaSigner::with_connector(session(), connector, &spec());
    let err = signer.sign(CSR_CN.as_bytes()).await.unwrap_err();
    assert!(err.to_string().contains("Location"));

    Ok(())
}

#[tokio::test]
async fn test_submit_rejected() -> Result<()> {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("GET"))
        .and(path("/v2/validationpolicy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(policy_json()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/certificates"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"description": "CSR signature invalid"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/trustchain"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let connector = MockConnector {
        base_url: format!("{}/v2", server.uri()),
    };
    let signer = HvcaSigner::with_connector(session(), connector, &spec());
    let err = signer.sign(CSR_CN.as_bytes()).await.unwrap_err();
    match err {
        IssuerError::RemoteError {
            status, message, ..
        } => {
            assert_eq!(status, 422);
            assert_eq!(message, "CSR signature invalid");
        }
        other => panic!("unexpected error: {:?}", other),
    }

    Ok(())
}
