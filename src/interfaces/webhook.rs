use crate::application::settlement::{SettlementOutcome, SettlementReconciler};
use crate::error::EngineError;
use serde::Serialize;

/// HTTP-shaped reply for a webhook delivery. The transport itself belongs to
/// the embedding application; this adapter only decides status and message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookReply {
    pub status: u16,
    pub message: String,
}

impl WebhookReply {
    fn new(status: u16, message: &str) -> Self {
        Self {
            status,
            message: message.to_string(),
        }
    }
}

/// Inbound webhook endpoint: raw body plus the `X-Signature` header value.
pub struct WebhookEndpoint {
    reconciler: SettlementReconciler,
}

impl WebhookEndpoint {
    pub fn new(reconciler: SettlementReconciler) -> Self {
        Self { reconciler }
    }

    pub async fn dispatch(&self, signature: Option<&str>, body: &[u8]) -> WebhookReply {
        match self.reconciler.handle_event(body, signature).await {
            Ok(SettlementOutcome::Settled) => WebhookReply::new(200, "settled"),
            Ok(SettlementOutcome::AlreadySettled) => WebhookReply::new(200, "already settled"),
            Ok(SettlementOutcome::Ignored) => WebhookReply::new(200, "ignored"),
            Err(err) => Self::reply_for(err),
        }
    }

    fn reply_for(err: EngineError) -> WebhookReply {
        match err {
            EngineError::InvalidSignature => WebhookReply::new(401, "invalid signature"),
            // The mismatch detail stays in operator tooling; callers get an
            // opaque refusal.
            EngineError::AmountMismatch { .. } => {
                WebhookReply::new(403, "payment could not be verified")
            }
            EngineError::Validation(message) => WebhookReply::new(400, &message),
            EngineError::NotFound(what) => {
                WebhookReply::new(400, &format!("unknown {what}"))
            }
            EngineError::InvalidPrice => WebhookReply::new(400, "booking is not priceable"),
            // Anything else is infrastructure trouble; 500 invites the
            // gateway to redeliver, which is safe under the idempotency
            // check.
            _ => WebhookReply::new(500, "internal error"),
        }
    }
}
