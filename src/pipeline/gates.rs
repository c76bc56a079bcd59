//! The three admission gates, in their fixed order.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::pipeline::{Decision, GateContext, RejectKind, Rejection};
use crate::security::canonical::canonical_string;
use crate::security::ip_filter::IpWhitelist;
use crate::security::rate_limit::RateLimiter;
use crate::security::signature::SignatureError;
use crate::security::VerifySignature;

/// One independent accept/reject check.
pub trait Gate: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the orchestrator must parse the body before this gate runs.
    fn needs_payload(&self) -> bool {
        false
    }

    fn check(&self, ctx: &GateContext<'_>) -> Decision;
}

/// Gate 1: the effective client address must be whitelisted.
pub struct IpGate {
    whitelist: Arc<ArcSwap<IpWhitelist>>,
}

impl IpGate {
    pub fn new(whitelist: Arc<ArcSwap<IpWhitelist>>) -> Self {
        Self { whitelist }
    }
}

impl Gate for IpGate {
    fn name(&self) -> &'static str {
        "ip"
    }

    fn check(&self, ctx: &GateContext<'_>) -> Decision {
        let snapshot = self.whitelist.load();
        if snapshot.is_allowed(ctx.client_ip) {
            Decision::Admit
        } else {
            Decision::Reject(Rejection::new(
                RejectKind::Ip,
                "IP address not allowed",
            ))
        }
    }
}

/// Gate 2: the client must be inside its request-rate budget.
pub struct RateGate {
    limiter: RateLimiter,
}

impl RateGate {
    pub fn new(limiter: RateLimiter) -> Self {
        Self { limiter }
    }
}

impl Gate for RateGate {
    fn name(&self) -> &'static str {
        "rate"
    }

    fn check(&self, ctx: &GateContext<'_>) -> Decision {
        let check = self.limiter.admit_now(&ctx.client_ip.to_string());
        if check.allowed {
            Decision::Admit
        } else {
            Decision::Reject(Rejection {
                kind: RejectKind::Rate,
                message: "Rate limit exceeded".to_string(),
                rate: Some(check),
            })
        }
    }
}

/// Gate 3: the payload must carry a valid signature over its own canonical
/// form. Runs last; it is the most expensive check.
pub struct SignatureGate {
    verifier: Arc<dyn VerifySignature>,
}

impl SignatureGate {
    pub fn new(verifier: Arc<dyn VerifySignature>) -> Self {
        Self { verifier }
    }
}

impl Gate for SignatureGate {
    fn name(&self) -> &'static str {
        "signature"
    }

    fn needs_payload(&self) -> bool {
        true
    }

    fn check(&self, ctx: &GateContext<'_>) -> Decision {
        let payload = ctx
            .payload
            .expect("orchestrator parses the payload before the signature gate");

        let Some(signature) = payload.signature() else {
            return Decision::Reject(Rejection::new(RejectKind::Signature, "Missing signature"));
        };

        let canonical = match canonical_string(&payload.unsigned_fields()) {
            Ok(canonical) => canonical,
            Err(e) => {
                return Decision::Reject(Rejection::new(RejectKind::Malformed, e.to_string()));
            }
        };

        match self.verifier.verify(&canonical, signature) {
            Ok(true) => Decision::Admit,
            Ok(false) => Decision::Reject(Rejection::new(
                RejectKind::Signature,
                "Signature is not valid",
            )),
            Err(SignatureError::Malformed(_)) => Decision::Reject(Rejection::new(
                RejectKind::Signature,
                "Signature is not valid base64",
            )),
            Err(e) => {
                // Key loading errors cannot occur at verify time; anything
                // else is an unexpected fault and must not leak detail.
                tracing::error!(error = %e, "Signature verification fault");
                Decision::Reject(Rejection::new(
                    RejectKind::Internal,
                    "Signature verification error",
                ))
            }
        }
    }
}
