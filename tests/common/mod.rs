//! Shared utilities for gateway integration tests.

use std::io::Write;
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use serde_json::{Map, Value};
use sha2::{Digest, Sha512};
use tempfile::NamedTempFile;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use webhook_gateway::config::GatewayConfig;
use webhook_gateway::security::canonical::canonical_string;
use webhook_gateway::HttpServer;

/// Keygen is slow; every test shares one signing key.
pub fn signing_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let mut rng = rand::thread_rng();
        RsaPrivateKey::new(&mut rng, 2048).expect("keygen")
    })
}

/// Write the signing key's public half as a PEM file the gateway can load.
pub fn write_public_key_pem() -> NamedTempFile {
    let pem = signing_key()
        .to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .expect("pem encode");
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(pem.as_bytes()).expect("write pem");
    file
}

/// Sign a payload the way the bank does: canonicalize everything except
/// `signature`, then SHA512withRSA over the canonical string.
pub fn sign_payload(payload: &mut Value) {
    let object = payload.as_object().expect("payload must be an object");
    let unsigned: Map<String, Value> = object
        .iter()
        .filter(|(k, _)| k.as_str() != "signature")
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let canonical = canonical_string(&unsigned).expect("canonicalize");

    let digest = Sha512::digest(canonical.as_bytes());
    let sig = signing_key()
        .sign(Pkcs1v15Sign::new::<Sha512>(), &digest)
        .expect("signing");

    payload
        .as_object_mut()
        .unwrap()
        .insert("signature".into(), Value::String(BASE64.encode(sig)));
}

/// A well-formed single-transaction batch.
pub fn sample_payload(batch_id: &str, transaction_id: &str) -> Value {
    serde_json::json!({
        "sourceAppId": "BANK_APP",
        "batchId": batch_id,
        "timestamp": "1700000000",
        "data": [{
            "transactionId": transaction_id,
            "tranRefNo": "REF_001",
            "srcAccountNumber": "1234567890123",
            "amount": 500000.0,
            "balanceAvailable": 2000000.0,
            "transType": "C"
        }]
    })
}

/// Gateway config suitable for local tests: loopback whitelist, generous
/// rate limit, metrics off to avoid recorder clashes across tests.
pub fn test_config(key_path: &std::path::Path) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.security.allowed_ips = vec!["127.0.0.1".into(), "::1".into()];
    config.security.bank_public_key_path = key_path.display().to_string();
    config.security.rate_limit_requests = 1000;
    config.observability.metrics_enabled = false;
    config
}

/// Start a gateway on an ephemeral loopback port and return its address.
pub async fn spawn_gateway(config: GatewayConfig) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config).expect("server init");
    let (_config_tx, config_updates) = mpsc::unbounded_channel();
    let (_shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);

    tokio::spawn(async move {
        // Keep the channels alive for the server's lifetime.
        let _tx = _config_tx;
        let _sd = _shutdown_tx;
        let _ = server.run(listener, config_updates, shutdown_rx).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    addr
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
