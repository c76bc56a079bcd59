//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → ip_filter.rs (resolve effective client IP, whitelist check)
//!     → rate_limit.rs (per-IP fixed-window budget)
//!     → canonical.rs (rebuild the signed byte string)
//!     → signature.rs (RSA-SHA512 verification)
//!     → Pass to the webhook processor
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - Checks ordered cheapest first; signature verification is CPU-bound and
//!   runs only for traffic that already passed IP and rate gates
//! - No trust in client input

pub mod canonical;
pub mod ip_filter;
pub mod rate_limit;
pub mod signature;

pub use canonical::{canonical_string, CanonicalError};
pub use ip_filter::IpWhitelist;
pub use rate_limit::{MemoryStore, RateCheck, RateLimitStore, RateLimiter};
pub use signature::{SignatureVerifier, VerifySignature};
