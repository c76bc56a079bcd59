//! Wire types for bank transaction notifications.
//!
//! Field names follow the bank's camelCase contract. Unknown fields are
//! ignored by this typed model; they still participate in signature
//! verification because the canonical string is built from the raw JSON
//! object, not from these structs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One notification batch as posted by the bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    pub source_app_id: String,
    pub batch_id: String,
    pub timestamp: String,
    #[serde(default)]
    pub data: Vec<TransactionRecord>,
    /// Base64 SHA512withRSA signature over the canonicalized remainder of
    /// the body. Verified by the admission pipeline before this struct is
    /// ever built.
    #[serde(default)]
    pub signature: Option<String>,
}

/// A single transaction inside a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub transaction_id: String,
    #[serde(default)]
    pub tran_ref_no: Option<String>,
    pub src_account_number: String,
    pub amount: f64,
    #[serde(default)]
    pub balance_available: Option<f64>,
    pub trans_type: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Per-transaction outcome reported back to the bank.
///
/// `error_code` values follow the bank contract: `01` processed, `02`
/// failed without detail (duplicates, internal faults), `04` failed with a
/// stated reason (validation).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResult {
    pub transaction_id: String,
    pub error_code: String,
    pub description: String,
    pub additional_info: Value,
}

impl TransactionResult {
    pub fn processed(transaction_id: &str) -> Self {
        Self {
            transaction_id: transaction_id.to_string(),
            error_code: codes::PROCESSED.to_string(),
            description: "Transaction processed successfully".to_string(),
            additional_info: Value::Object(Default::default()),
        }
    }

    pub fn duplicate(transaction_id: &str) -> Self {
        Self {
            transaction_id: transaction_id.to_string(),
            error_code: codes::FAILED.to_string(),
            description: "Duplicate transaction".to_string(),
            additional_info: serde_json::json!({"reason": "duplicate_transaction"}),
        }
    }

    pub fn invalid(transaction_id: &str, errors: &[String]) -> Self {
        let detail = errors.join(", ");
        Self {
            transaction_id: transaction_id.to_string(),
            error_code: codes::FAILED_WITH_REASON.to_string(),
            description: format!("Validation failed: {}", detail),
            additional_info: serde_json::json!({"validation_errors": detail}),
        }
    }
}

/// Bank result codes.
pub mod codes {
    pub const PROCESSED: &str = "01";
    pub const FAILED: &str = "02";
    pub const FAILED_WITH_REASON: &str = "04";
}
