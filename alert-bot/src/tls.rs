//! TLS for serving the webhook directly on 8443, without a reverse proxy.

use crate::config::TlsPaths;
use anyhow::{anyhow, ensure, Context, Result};
use axum_server::tls_rustls::RustlsConfig;
use rustls::crypto::aws_lc_rs;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

fn pem_reader(path: &str) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .with_context(|| format!("cannot open {path}"))
}

fn read_certificates(path: &str) -> Result<Vec<CertificateDer<'static>>> {
    let chain: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut pem_reader(path)?)
        .collect::<Result<_, _>>()
        .with_context(|| format!("bad certificate PEM in {path}"))?;
    ensure!(!chain.is_empty(), "{path} holds no certificate");
    Ok(chain)
}

/// PKCS#8, PKCS#1 and SEC1 keys are all accepted; the first one wins.
fn read_key(path: &str) -> Result<PrivateKeyDer<'static>> {
    rustls_pemfile::private_key(&mut pem_reader(path)?)
        .with_context(|| format!("bad key PEM in {path}"))?
        .ok_or_else(|| anyhow!("{path} holds no private key"))
}

/// Build the listener config from the configured certificate and key.
pub async fn load_rustls_config(paths: &TlsPaths) -> Result<RustlsConfig> {
    let chain = read_certificates(&paths.cert_path)?;
    let key = read_key(&paths.key_path)?;

    let mut server = ServerConfig::builder_with_provider(Arc::new(aws_lc_rs::default_provider()))
        .with_safe_default_protocol_versions()
        .context("TLS protocol versions")?
        .with_no_client_auth()
        .with_single_cert(chain, key)
        .context("certificate or key rejected")?;
    // Telegram delivers webhooks over HTTP/1.1 only
    server.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(RustlsConfig::from_config(Arc::new(server)))
}
