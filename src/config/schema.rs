//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the webhook gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Admission security: whitelist, rate limits, bank key.
    pub security: SecurityConfig,

    /// Business processing settings.
    pub webhook: WebhookConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8443").
    pub bind_address: String,

    /// Optional TLS configuration. Without it the gateway serves plain
    /// HTTP, which is only suitable behind a TLS-terminating proxy or in
    /// tests.
    pub tls: Option<TlsConfig>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8443".to_string(),
            tls: None,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// TLS configuration for the listener. The client CA makes the handshake
/// mutual: connections without a certificate signed by it are refused.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to the server certificate file (PEM).
    pub cert_path: String,

    /// Path to the server private key file (PEM).
    pub key_path: String,

    /// Path to the CA bundle used to verify client certificates (PEM).
    pub client_ca_path: String,
}

/// Admission security configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Whitelisted sources: single IPs or CIDR blocks.
    pub allowed_ips: Vec<String>,

    /// Maximum requests per client per window.
    pub rate_limit_requests: u32,

    /// Rate window length in seconds.
    pub rate_limit_window_secs: u64,

    /// How long an expired rate window is retained before cleanup.
    pub rate_limit_retention_secs: u64,

    /// How often the cleanup task runs.
    pub rate_limit_cleanup_interval_secs: u64,

    /// Path to the bank's public key (PEM, SubjectPublicKeyInfo).
    pub bank_public_key_path: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_ips: vec!["127.0.0.1".to_string(), "::1".to_string()],
            rate_limit_requests: 60,
            rate_limit_window_secs: 60,
            rate_limit_retention_secs: 120,
            rate_limit_cleanup_interval_secs: 60,
            bank_public_key_path: "certs/bank_public.pem".to_string(),
        }
    }
}

/// Business processing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// How long processed transaction ids are kept for duplicate detection.
    pub dedup_retention_secs: u64,

    /// How often the dedup set is pruned.
    pub dedup_cleanup_interval_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            dedup_retention_secs: 30 * 24 * 60 * 60,
            dedup_cleanup_interval_secs: 60 * 60,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Emit logs as JSON (pretty text otherwise).
    pub log_json: bool,

    /// Default log filter when RUST_LOG is unset.
    pub log_filter: String,

    /// Install the Prometheus recorder and expose /metrics.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_json: false,
            log_filter: "webhook_gateway=info,tower_http=warn".to_string(),
            metrics_enabled: true,
        }
    }
}
