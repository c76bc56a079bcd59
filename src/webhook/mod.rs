//! Notification payload model and business processing.
//!
//! # Data Flow
//! ```text
//! Admitted request body
//!     → types.rs (typed camelCase wire model)
//!     → processor.rs (dedup, validation, per-transaction results)
//!     → http::response (envelope assembly)
//! ```

pub mod processor;
pub mod types;

pub use processor::{BatchOutcome, ProcessorStats, WebhookProcessor};
pub use types::{TransactionRecord, TransactionResult, WebhookRequest};
