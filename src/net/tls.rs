//! TLS configuration and certificate loading.
//!
//! The bank connection is mutually authenticated: the listener presents the
//! server certificate and requires a client certificate signed by the
//! configured CA. The admission pipeline itself never touches TLS; it only
//! consumes the already-authenticated connection's peer address.

use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::RootCertStore;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("no certificates found in {0}")]
    EmptyCertChain(String),

    #[error("no private key found in {0}")]
    NoPrivateKey(String),

    #[error("client verifier setup failed: {0}")]
    Verifier(#[from] rustls::server::VerifierBuilderError),

    #[error("TLS configuration rejected: {0}")]
    Config(#[from] rustls::Error),
}

/// Build a mutual-TLS server configuration: server cert/key plus a client
/// CA that every connecting peer must chain to. Runs once at startup,
/// before the listener accepts traffic.
pub fn load_mtls_config(
    cert_path: &Path,
    key_path: &Path,
    client_ca_path: &Path,
) -> Result<RustlsConfig, TlsError> {
    let certs = read_certs(cert_path)?;
    if certs.is_empty() {
        return Err(TlsError::EmptyCertChain(display(cert_path)));
    }
    let key = read_key(key_path)?;

    let mut roots = RootCertStore::empty();
    let ca_certs = read_certs(client_ca_path)?;
    if ca_certs.is_empty() {
        return Err(TlsError::EmptyCertChain(display(client_ca_path)));
    }
    for cert in ca_certs {
        roots.add(cert)?;
    }

    let verifier = WebPkiClientVerifier::builder(Arc::new(roots)).build()?;
    let config = rustls::ServerConfig::builder()
        .with_client_cert_verifier(verifier)
        .with_single_cert(certs, key)?;

    Ok(RustlsConfig::from_config(Arc::new(config)))
}

fn read_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let file = std::fs::File::open(path).map_err(|source| TlsError::Io {
        path: display(path),
        source,
    })?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Io {
            path: display(path),
            source,
        })
}

fn read_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    let file = std::fs::File::open(path).map_err(|source| TlsError::Io {
        path: display(path),
        source,
    })?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::private_key(&mut reader)
        .map_err(|source| TlsError::Io {
            path: display(path),
            source,
        })?
        .ok_or_else(|| TlsError::NoPrivateKey(display(path)))
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
