//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate whitelist entries parse as IPs or CIDR blocks
//! - Validate value ranges (window > 0, budget > 0)
//! - Check that the listener address parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::security::ip_filter;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "listener.bind_address".to_string(),
            message: format!("'{}' is not a valid socket address", config.listener.bind_address),
        });
    }

    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError {
            field: "listener.max_body_bytes".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }

    if config.security.allowed_ips.is_empty() {
        errors.push(ValidationError {
            field: "security.allowed_ips".to_string(),
            message: "whitelist is empty; every request would be rejected".to_string(),
        });
    }
    for entry in &config.security.allowed_ips {
        if ip_filter::parse_entry(entry).is_err() {
            errors.push(ValidationError {
                field: "security.allowed_ips".to_string(),
                message: format!("'{}' is not an IP address or CIDR block", entry),
            });
        }
    }

    if config.security.rate_limit_requests == 0 {
        errors.push(ValidationError {
            field: "security.rate_limit_requests".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    if config.security.rate_limit_window_secs == 0 {
        errors.push(ValidationError {
            field: "security.rate_limit_window_secs".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }

    if config.security.bank_public_key_path.trim().is_empty() {
        errors.push(ValidationError {
            field: "security.bank_public_key_path".to_string(),
            message: "must point at the bank's public key PEM".to_string(),
        });
    } else if !Path::new(&config.security.bank_public_key_path).is_file() {
        errors.push(ValidationError {
            field: "security.bank_public_key_path".to_string(),
            message: format!(
                "'{}' does not exist",
                config.security.bank_public_key_path
            ),
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError {
            field: "timeouts.request_secs".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
