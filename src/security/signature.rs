//! RSA signature verification for bank callbacks.
//!
//! The bank signs the canonical string with SHA512withRSA (PKCS#1 v1.5
//! padding, 2048-bit key). The public key is loaded from PEM once at startup
//! and is read-only for the process lifetime.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha2::{Digest, Sha512};
use thiserror::Error;

/// Signature machinery failures. A well-formed but wrong signature is not an
/// error; it is an `Ok(false)` verification outcome.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("failed to read public key file: {0}")]
    KeyFile(#[from] std::io::Error),

    #[error("failed to parse public key PEM: {0}")]
    KeyParse(#[from] rsa::pkcs8::spki::Error),

    #[error("signature is not valid base64: {0}")]
    Malformed(#[source] base64::DecodeError),
}

/// Verification seam for the admission pipeline. Tests substitute a counting
/// or stub implementation to assert gate ordering.
pub trait VerifySignature: Send + Sync {
    fn verify(&self, canonical: &str, signature_b64: &str) -> Result<bool, SignatureError>;
}

/// Verifies SHA512withRSA signatures against the bank's public key.
pub struct SignatureVerifier {
    key: RsaPublicKey,
}

impl SignatureVerifier {
    pub fn new(key: RsaPublicKey) -> Self {
        Self { key }
    }

    /// Load the bank's public key from a PEM (SubjectPublicKeyInfo) file.
    pub fn from_pem_file(path: &Path) -> Result<Self, SignatureError> {
        let pem = fs::read_to_string(path)?;
        let key = RsaPublicKey::from_public_key_pem(&pem)?;
        Ok(Self::new(key))
    }
}

impl VerifySignature for SignatureVerifier {
    fn verify(&self, canonical: &str, signature_b64: &str) -> Result<bool, SignatureError> {
        let signature = BASE64
            .decode(signature_b64.trim())
            .map_err(SignatureError::Malformed)?;

        let digest = Sha512::digest(canonical.as_bytes());
        Ok(self
            .key
            .verify(Pkcs1v15Sign::new::<Sha512>(), &digest, &signature)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::RsaPrivateKey;

    // Keygen is slow; share one pair across tests.
    fn test_keypair() -> (RsaPrivateKey, RsaPublicKey) {
        static KEY: std::sync::OnceLock<RsaPrivateKey> = std::sync::OnceLock::new();
        let private = KEY
            .get_or_init(|| {
                let mut rng = rand::thread_rng();
                RsaPrivateKey::new(&mut rng, 2048).expect("keygen")
            })
            .clone();
        let public = private.to_public_key();
        (private, public)
    }

    fn sign(private: &RsaPrivateKey, canonical: &str) -> String {
        let digest = Sha512::digest(canonical.as_bytes());
        let sig = private
            .sign(Pkcs1v15Sign::new::<Sha512>(), &digest)
            .expect("signing");
        BASE64.encode(sig)
    }

    #[test]
    fn round_trip_verifies() {
        let (private, public) = test_keypair();
        let verifier = SignatureVerifier::new(public);
        let canonical = "amount=500000.0&batchId=B1&timestamp=1700000000";

        let sig = sign(&private, canonical);
        assert!(verifier.verify(canonical, &sig).unwrap());
    }

    #[test]
    fn any_flipped_byte_fails_verification() {
        let (private, public) = test_keypair();
        let verifier = SignatureVerifier::new(public);
        let canonical = "batchId=B1&sourceAppId=BANK";

        let sig_b64 = sign(&private, canonical);
        let mut raw = BASE64.decode(&sig_b64).unwrap();
        for i in (0..raw.len()).step_by(17) {
            raw[i] ^= 0x01;
            let tampered = BASE64.encode(&raw);
            assert!(
                !verifier.verify(canonical, &tampered).unwrap(),
                "flipped byte {} still verified",
                i
            );
            raw[i] ^= 0x01;
        }
    }

    #[test]
    fn signature_over_different_payload_is_false_not_error() {
        let (private, public) = test_keypair();
        let verifier = SignatureVerifier::new(public);

        let sig = sign(&private, "batchId=B1");
        assert!(!verifier.verify("batchId=B2", &sig).unwrap());
    }

    #[test]
    fn invalid_base64_is_malformed() {
        let (_, public) = test_keypair();
        let verifier = SignatureVerifier::new(public);

        match verifier.verify("batchId=B1", "not//valid==base64!!!") {
            Err(SignatureError::Malformed(_)) => {}
            other => panic!("expected malformed signature, got {:?}", other),
        }
    }

    #[test]
    fn wrong_key_fails_verification() {
        let (signer, _) = test_keypair();
        let mut rng = rand::thread_rng();
        let other = RsaPrivateKey::new(&mut rng, 2048).expect("keygen");
        let verifier = SignatureVerifier::new(other.to_public_key());

        let sig = sign(&signer, "batchId=B1");
        assert!(!verifier.verify("batchId=B1", &sig).unwrap());
    }
}
