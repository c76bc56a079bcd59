//! The response envelope.
//!
//! # Responsibilities
//! - Render every outcome, success or rejection, into the one envelope
//!   shape the bank expects: `{batchId, code, message, data}`
//! - Map rejection kinds to HTTP status codes
//! - Attach `X-RateLimit-*` headers to rate rejections
//!
//! # Design Decisions
//! - No alternate shapes: the envelope is a hard external contract
//! - `code` is string-typed per the bank contract ("200", "401", ...)
//! - Rejections never expose internal detail beyond the reason message

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use crate::pipeline::{PipelineResponse, Rejection};
use crate::webhook::processor::BatchOutcome;
use crate::webhook::TransactionResult;

/// Placeholder batch id when the request body could not be parsed.
pub const UNKNOWN_BATCH: &str = "unknown";

/// The uniform response body.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    #[serde(rename = "batchId")]
    pub batch_id: String,
    pub code: String,
    pub message: String,
    pub data: Vec<TransactionResult>,
}

/// Envelope for a rejected request: empty data, code matching the kind.
pub fn rejection(batch_id: Option<&str>, rejection: &Rejection) -> (Envelope, StatusCode) {
    let envelope = Envelope {
        batch_id: batch_id.unwrap_or(UNKNOWN_BATCH).to_string(),
        code: rejection.kind.code().to_string(),
        message: rejection.message.clone(),
        data: Vec::new(),
    };
    (envelope, rejection.kind.status())
}

/// Envelope for an admitted request, carrying per-transaction results.
pub fn success(batch_id: &str, outcome: &BatchOutcome) -> (Envelope, StatusCode) {
    let (code, message, status) = if outcome.all_ok() {
        ("200", "Success", StatusCode::OK)
    } else {
        ("400", "Some transactions failed", StatusCode::BAD_REQUEST)
    };
    let envelope = Envelope {
        batch_id: batch_id.to_string(),
        code: code.to_string(),
        message: message.to_string(),
        data: outcome.results.clone(),
    };
    (envelope, status)
}

impl IntoResponse for PipelineResponse {
    fn into_response(self) -> Response {
        let rate = self.rate;
        let mut response = (self.status, Json(self.envelope)).into_response();
        if let Some(rate) = rate {
            let headers = response.headers_mut();
            headers.insert("x-ratelimit-limit", int_header(rate.limit as u64));
            headers.insert("x-ratelimit-remaining", int_header(rate.remaining() as u64));
            headers.insert("x-ratelimit-reset", int_header(rate.reset_at));
        }
        response
    }
}

fn int_header(v: u64) -> HeaderValue {
    HeaderValue::from_str(&v.to_string()).unwrap_or(HeaderValue::from_static("0"))
}
