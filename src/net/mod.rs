//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → tls.rs (mutual-TLS handshake: server cert + required client cert)
//!     → Hand off to the HTTP layer with the peer address attached
//! ```
//!
//! # Design Decisions
//! - The bank webhook endpoint is mutually authenticated; plain-TCP mode
//!   exists only for local development
//! - TLS material is loaded once at startup, not hot-reloaded

pub mod tls;
