//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware, handlers)
//!     → pipeline (admission gates decide accept or reject)
//!     → response.rs (uniform envelope, rate-limit headers)
//!     → Send to bank
//! ```

pub mod response;
pub mod server;

pub use response::Envelope;
pub use server::HttpServer;
