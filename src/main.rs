//! Atlas issuer CLI.
//!
//! Runs the issuance protocol against an HVCA account from the command line:
//! sign a CSR, print the account's validation policy, or report health.

use atlas_issuer::ca::client::{CaClient, Connect, HvcaConnector};
use atlas_issuer::config::{IssuerSpec, SecretData};
use atlas_issuer::error::{IssuerError, Result};
use atlas_issuer::signer::bootstrap::SessionConfig;
use atlas_issuer::signer::{hvca_health_checker_from_issuer_and_secret_data, HvcaSigner};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "atlas-issuer")]
#[command(about = "Issue certificates through an HVCA account over mTLS", long_about = None)]
struct Cli {
    #[command(flatten)]
    issuer: IssuerArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct IssuerArgs {
    /// Issuer specification file (JSON)
    #[arg(long, env = "ATLAS_ISSUER_SPEC", conflicts_with = "url")]
    issuer: Option<PathBuf>,

    /// CA API base URL, used with default settings when no spec file is given
    #[arg(long, env = "ATLAS_ISSUER_URL")]
    url: Option<String>,

    /// Directory holding the credential secret, one file per key
    #[arg(long, env = "ATLAS_ISSUER_SECRET_DIR")]
    secret_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign a CSR and write the certificate and chain
    Sign {
        /// CSR file (PEM or DER)
        #[arg(long)]
        csr: PathBuf,

        /// Output file for the leaf certificate (PEM)
        #[arg(long)]
        cert_out: PathBuf,

        /// Output file for the CA chain (PEM)
        #[arg(long)]
        chain_out: PathBuf,
    },

    /// Print the account's validation policy
    Policy,

    /// Check issuer health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let spec = load_spec(&cli.issuer)?;
    let secret = SecretData::from_dir(&cli.issuer.secret_dir)?;

    match cli.command {
        Commands::Sign {
            csr,
            cert_out,
            chain_out,
        } => handle_sign(&spec, &secret, &csr, &cert_out, &chain_out).await,
        Commands::Policy => handle_policy(&spec, &secret).await,
        Commands::Health => handle_health(&spec, &secret),
    }
}

fn load_spec(args: &IssuerArgs) -> Result<IssuerSpec> {
    match (&args.issuer, &args.url) {
        (Some(path), _) => IssuerSpec::from_file(path),
        (None, Some(url)) => Ok(IssuerSpec::new(url.clone())),
        (None, None) => Err(IssuerError::ConfigError(
            "either --issuer or --url is required".to_string(),
        )),
    }
}

async fn handle_sign(
    spec: &IssuerSpec,
    secret: &SecretData,
    csr: &Path,
    cert_out: &Path,
    chain_out: &Path,
) -> Result<()> {
    let signer = HvcaSigner::from_issuer_and_secret(spec, secret)?;
    let csr_bytes = fs::read(csr)?;

    let (certificate, chain) = signer.sign(&csr_bytes).await?.into_parts();

    fs::write(cert_out, &certificate)?;
    fs::write(chain_out, &chain)?;

    println!("Certificate written to: {}", cert_out.display());
    println!("Chain written to: {}", chain_out.display());

    Ok(())
}

async fn handle_policy(spec: &IssuerSpec, secret: &SecretData) -> Result<()> {
    let session = SessionConfig::from_issuer_and_secret(spec, secret)?;
    let client = HvcaConnector.connect(&session).await?;
    let policy = client.policy().await?;

    println!("{}", serde_json::to_string_pretty(&policy)?);
    Ok(())
}

fn handle_health(spec: &IssuerSpec, secret: &SecretData) -> Result<()> {
    let checker = hvca_health_checker_from_issuer_and_secret_data(spec, secret)?;
    checker.check()?;

    println!("Issuer is healthy");
    Ok(())
}
