//! Admission pipeline for bank callbacks.
//!
//! # Data Flow
//! ```text
//! raw body + peer addr + headers
//!     → resolve effective client IP
//!     → IP gate        (whitelist)
//!     → rate gate      (per-IP window budget)
//!     → payload parse  (JSON object, signature extracted)
//!     → signature gate (canonical string + RSA-SHA512)
//!     → webhook processor (business handling)
//!     → response envelope
//! ```
//!
//! # Design Decisions
//! - Gates are an explicit ordered list, not nested wrappers; the
//!   orchestrator iterates and short-circuits on the first rejection
//! - Order is fixed cheapest-first so hostile traffic cannot use signature
//!   verification as a CPU denial-of-service vector
//! - Every outcome, success or rejection, flows through the same envelope

pub mod gates;

use std::net::IpAddr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::http::{HeaderMap, StatusCode};
use serde_json::{Map, Value};

use crate::http::response::{self, Envelope};
use crate::observability::metrics;
use crate::security::ip_filter::{self, IpWhitelist};
use crate::security::rate_limit::{unix_now, RateCheck, RateLimiter};
use crate::security::VerifySignature;
use crate::webhook::{WebhookProcessor, WebhookRequest};

use gates::{Gate, IpGate, RateGate, SignatureGate};

/// Terminal classification of a rejected request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectKind {
    Ip,
    Rate,
    Signature,
    Malformed,
    Internal,
}

impl RejectKind {
    /// String status code used inside the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            RejectKind::Ip => "403",
            RejectKind::Rate => "429",
            RejectKind::Signature => "401",
            RejectKind::Malformed => "400",
            RejectKind::Internal => "500",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RejectKind::Ip => StatusCode::FORBIDDEN,
            RejectKind::Rate => StatusCode::TOO_MANY_REQUESTS,
            RejectKind::Signature => StatusCode::UNAUTHORIZED,
            RejectKind::Malformed => StatusCode::BAD_REQUEST,
            RejectKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Metric label for the gate that produced the rejection.
    pub fn gate_label(&self) -> &'static str {
        match self {
            RejectKind::Ip => "ip",
            RejectKind::Rate => "rate",
            RejectKind::Signature => "signature",
            RejectKind::Malformed => "payload",
            RejectKind::Internal => "internal",
        }
    }
}

/// A terminal rejection, carrying the reason shown to the caller and, for
/// rate rejections, the window state for the `X-RateLimit-*` headers.
#[derive(Debug, Clone)]
pub struct Rejection {
    pub kind: RejectKind,
    pub message: String,
    pub rate: Option<RateCheck>,
}

impl Rejection {
    pub fn new(kind: RejectKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            rate: None,
        }
    }
}

/// Outcome of a single gate.
#[derive(Debug, Clone)]
pub enum Decision {
    Admit,
    Reject(Rejection),
}

/// Request view passed to each gate.
pub struct GateContext<'a> {
    pub client_ip: IpAddr,
    /// Populated by the orchestrator before the first gate that needs it.
    pub payload: Option<&'a ParsedPayload>,
}

/// The request body parsed into a JSON object, with accessors for the
/// signature-relevant pieces.
#[derive(Debug, Clone)]
pub struct ParsedPayload {
    object: Map<String, Value>,
}

impl ParsedPayload {
    pub fn parse(raw: &[u8]) -> Result<Self, String> {
        if raw.is_empty() {
            return Err("Empty request body".to_string());
        }
        let value: Value =
            serde_json::from_slice(raw).map_err(|_| "Invalid JSON format".to_string())?;
        match value {
            Value::Object(object) => Ok(Self { object }),
            _ => Err("Payload must be a JSON object".to_string()),
        }
    }

    pub fn signature(&self) -> Option<&str> {
        self.object.get("signature").and_then(Value::as_str)
    }

    pub fn batch_id(&self) -> Option<&str> {
        self.object.get("batchId").and_then(Value::as_str)
    }

    /// The signed field set: everything except `signature`.
    pub fn unsigned_fields(&self) -> Map<String, Value> {
        let mut fields = self.object.clone();
        fields.remove("signature");
        fields
    }

    pub fn to_request(&self) -> Result<WebhookRequest, serde_json::Error> {
        serde_json::from_value(Value::Object(self.object.clone()))
    }
}

/// Fully formatted pipeline outcome, ready for the HTTP layer.
#[derive(Debug, Clone)]
pub struct PipelineResponse {
    pub envelope: Envelope,
    pub status: StatusCode,
    pub rate: Option<RateCheck>,
}

/// Ordered, short-circuiting chain of admission gates.
pub struct AdmissionPipeline {
    whitelist: Arc<ArcSwap<IpWhitelist>>,
    gates: Vec<Box<dyn Gate>>,
    processor: Arc<WebhookProcessor>,
}

impl AdmissionPipeline {
    pub fn new(
        whitelist: Arc<ArcSwap<IpWhitelist>>,
        limiter: RateLimiter,
        verifier: Arc<dyn VerifySignature>,
        processor: Arc<WebhookProcessor>,
    ) -> Self {
        let gates: Vec<Box<dyn Gate>> = vec![
            Box::new(IpGate::new(whitelist.clone())),
            Box::new(RateGate::new(limiter)),
            Box::new(SignatureGate::new(verifier)),
        ];
        Self {
            whitelist,
            gates,
            processor,
        }
    }

    /// Atomically replace the whitelist snapshot (config reload).
    pub fn swap_whitelist(&self, whitelist: IpWhitelist) {
        tracing::info!(networks = whitelist.len(), "Whitelist snapshot swapped");
        self.whitelist.store(Arc::new(whitelist));
    }

    /// Single entry point for the HTTP layer: run every gate in order, then
    /// hand the admitted payload to the webhook processor.
    pub fn handle(&self, raw_body: &[u8], peer: IpAddr, headers: &HeaderMap) -> PipelineResponse {
        let client_ip = ip_filter::client_ip(peer, headers);
        let mut parsed: Option<ParsedPayload> = None;

        for gate in &self.gates {
            if gate.needs_payload() && parsed.is_none() {
                match ParsedPayload::parse(raw_body) {
                    Ok(payload) => parsed = Some(payload),
                    Err(message) => {
                        let rejection = Rejection::new(RejectKind::Malformed, message);
                        return self.reject(client_ip, batch_id_hint(raw_body), rejection);
                    }
                }
            }

            let ctx = GateContext {
                client_ip,
                payload: parsed.as_ref(),
            };
            if let Decision::Reject(rejection) = gate.check(&ctx) {
                let batch_id = parsed
                    .as_ref()
                    .and_then(|p| p.batch_id().map(str::to_string))
                    .or_else(|| batch_id_hint(raw_body));
                return self.reject(client_ip, batch_id, rejection);
            }
        }

        let parsed = parsed.expect("gate list always ends in a payload-bearing gate");

        let request = match parsed.to_request() {
            Ok(request) => request,
            Err(e) => {
                let rejection = Rejection::new(
                    RejectKind::Malformed,
                    format!("Invalid payload structure: {}", e),
                );
                return self.reject(client_ip, parsed.batch_id().map(str::to_string), rejection);
            }
        };

        tracing::info!(
            client_ip = %client_ip,
            batch_id = %request.batch_id,
            transactions = request.data.len(),
            "Request admitted"
        );

        let outcome = self.processor.process_batch(&request, unix_now());
        let (envelope, status) = response::success(&request.batch_id, &outcome);
        PipelineResponse {
            envelope,
            status,
            rate: None,
        }
    }

    fn reject(
        &self,
        client_ip: IpAddr,
        batch_id: Option<String>,
        rejection: Rejection,
    ) -> PipelineResponse {
        tracing::warn!(
            client_ip = %client_ip,
            batch_id = %batch_id.as_deref().unwrap_or(response::UNKNOWN_BATCH),
            gate = rejection.kind.gate_label(),
            reason = %rejection.message,
            "Request rejected"
        );
        metrics::record_rejection(rejection.kind.gate_label());

        let rate = rejection.rate;
        let (envelope, status) = response::rejection(batch_id.as_deref(), &rejection);
        PipelineResponse {
            envelope,
            status,
            rate,
        }
    }
}

/// Best-effort batch id extraction for rejections that happen before the
/// payload gate parses the body.
fn batch_id_hint(raw: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(raw).ok()?;
    value.get("batchId")?.as_str().map(str::to_string)
}
