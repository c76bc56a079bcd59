//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Initialize subsystems → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then admission state, then listener
//! - Ordered shutdown: stop accept, drain, close
//! - Background tasks (rate window purge, dedup prune) end with the process

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
