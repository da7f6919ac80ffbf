use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::money::{from_minor_units, within_tolerance};
use crate::domain::payment::{Payment, PaymentMethod};
use crate::domain::ports::{
    ActivityLogBox, AgentStoreBox, BookingStoreBox, NotifierBox, PackageStoreBox, PaymentStoreBox,
    SettlementApply,
};
use crate::domain::pricing::resolve_price;
use crate::error::{EngineError, Result};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha512;
use subtle::ConstantTimeEq;

type HmacSha512 = Hmac<Sha512>;

/// The only event type that settles a charge; everything else is accepted
/// and ignored.
const EVENT_CHARGE_SUCCESS: &str = "charge.success";

/// Gateway completion signal, as delivered to the webhook.
#[derive(Debug, Deserialize)]
pub struct GatewayEvent {
    pub event: String,
    pub data: GatewayEventData,
}

#[derive(Debug, Deserialize)]
pub struct GatewayEventData {
    pub reference: String,
    /// Paid amount in integer minor units.
    pub amount: i64,
    #[serde(default)]
    pub metadata: EventMetadata,
    #[serde(default)]
    pub customer: Option<EventCustomer>,
}

/// Opaque metadata we attached at checkout, echoed back by the gateway.
#[derive(Debug, Default, Deserialize)]
pub struct EventMetadata {
    #[serde(default)]
    pub booking_id: Option<u32>,
    #[serde(default)]
    pub cancel_action: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventCustomer {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    Settled,
    /// A duplicate or out-of-order delivery for a booking that already
    /// settled. Success, not an error.
    AlreadySettled,
    /// An event type this core does not act on.
    Ignored,
}

/// Reconciles asynchronous gateway confirmations against the authoritative
/// price and promotes the booking + payment pair exactly once.
///
/// Safe under at-least-once and out-of-order delivery: the verified payment
/// row per (booking, method) is the idempotency anchor, and the promotion
/// itself is a compare-and-set in the payment store.
pub struct SettlementReconciler {
    bookings: BookingStoreBox,
    packages: PackageStoreBox,
    agents: AgentStoreBox,
    payments: PaymentStoreBox,
    notifier: NotifierBox,
    activity: ActivityLogBox,
    webhook_secret: String,
}

impl SettlementReconciler {
    pub fn new(
        bookings: BookingStoreBox,
        packages: PackageStoreBox,
        agents: AgentStoreBox,
        payments: PaymentStoreBox,
        notifier: NotifierBox,
        activity: ActivityLogBox,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            bookings,
            packages,
            agents,
            payments,
            notifier,
            activity,
            webhook_secret: webhook_secret.into(),
        }
    }

    /// Recomputes the HMAC-SHA-512 of the raw body and compares it against
    /// the signature header in constant time. Fails closed: nothing past
    /// this point sees an unauthenticated body.
    pub fn verify_signature(&self, body: &[u8], signature: Option<&str>) -> Result<()> {
        let provided = signature.ok_or(EngineError::InvalidSignature)?;
        let mut mac = HmacSha512::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| EngineError::internal("webhook secret rejected by hmac"))?;
        mac.update(body);
        let expected = hex::encode(mac.finalize().into_bytes());
        if bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) {
            Ok(())
        } else {
            Err(EngineError::InvalidSignature)
        }
    }

    pub async fn handle_event(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<SettlementOutcome> {
        self.verify_signature(body, signature)?;

        let event: GatewayEvent = serde_json::from_slice(body)
            .map_err(|e| EngineError::Validation(format!("malformed event payload: {e}")))?;
        if event.event != EVENT_CHARGE_SUCCESS {
            return Ok(SettlementOutcome::Ignored);
        }
        let booking_id = event
            .data
            .metadata
            .booking_id
            .ok_or_else(|| EngineError::Validation("event metadata is missing the booking id".to_string()))?;

        // Redelivery fast path: a settled pair makes every replay a no-op.
        // The booking promotion is still re-asserted, in case an earlier
        // delivery failed between the payment write and that step; the
        // write is idempotent, so repeats are harmless.
        if self
            .payments
            .has_verified(booking_id, PaymentMethod::Gateway)
            .await?
        {
            self.bookings
                .set_status(booking_id, BookingStatus::Confirmed)
                .await?;
            return Ok(SettlementOutcome::AlreadySettled);
        }

        let booking = self
            .bookings
            .get(booking_id)
            .await?
            .ok_or(EngineError::NotFound("booking"))?;
        let package = self
            .packages
            .get(booking.package_id)
            .await?
            .ok_or(EngineError::NotFound("package"))?;
        let agent = match booking.agent_id {
            Some(agent_id) => self.agents.get(agent_id).await?,
            None => None,
        };

        let expected = resolve_price(&package, agent.as_ref())?;
        let paid = from_minor_units(event.data.amount);
        // Deposits are absolute amounts, never derived from commission.
        let deposit_ok = package.deposit_allowed
            && package
                .minimum_deposit
                .is_some_and(|minimum| within_tolerance(paid, minimum));
        if !within_tolerance(paid, expected) && !deposit_ok {
            tracing::warn!(
                booking_id,
                %paid,
                %expected,
                reference = %event.data.reference,
                "paid amount does not match resolved price; rejecting delivery"
            );
            if let Err(e) = self
                .activity
                .record(
                    None,
                    "payment.amount_mismatch",
                    json!({
                        "booking_id": booking_id,
                        "reference": event.data.reference,
                        "paid": paid,
                        "expected": expected,
                    }),
                )
                .await
            {
                tracing::warn!(error = %e, booking_id, "failed to record amount mismatch");
            }
            return Err(EngineError::AmountMismatch { paid, expected });
        }

        let applied = self
            .payments
            .apply_settlement(
                booking_id,
                PaymentMethod::Gateway,
                paid,
                &event.data.reference,
                Utc::now(),
            )
            .await?;
        let payment = match applied {
            SettlementApply::Applied(payment) => payment,
            // Lost the race against a duplicate delivery or a manual
            // verification between our check and the write. Re-assert the
            // booking promotion before acknowledging, as above.
            SettlementApply::AlreadySettled => {
                self.bookings
                    .set_status(booking_id, BookingStatus::Confirmed)
                    .await?;
                return Ok(SettlementOutcome::AlreadySettled);
            }
        };

        self.bookings
            .set_status(booking_id, BookingStatus::Confirmed)
            .await?;

        let payer = event
            .data
            .customer
            .as_ref()
            .and_then(|customer| customer.email.as_deref());
        self.post_settlement(&booking, &payment, payer).await;

        Ok(SettlementOutcome::Settled)
    }

    /// Best-effort post-commit hook. The settlement already stands; a
    /// failure here is logged and never propagated.
    async fn post_settlement(&self, booking: &Booking, payment: &Payment, payer: Option<&str>) {
        if let Err(e) = self
            .activity
            .record(
                None,
                "payment.settled",
                json!({
                    "booking_id": booking.id,
                    "payment_id": payment.id,
                    "amount": payment.amount,
                    "reference": payment.gateway_reference,
                }),
            )
            .await
        {
            tracing::warn!(error = %e, booking_id = booking.id, "activity record failed after settlement");
        }

        if let Some(email) = payer {
            let subject = format!("Payment received for booking {}", booking.reference);
            let html = format!(
                "<p>Your payment of {} for booking {} has been confirmed.</p>",
                payment.amount, booking.reference
            );
            if let Err(e) = self.notifier.send_email(email, &subject, &html).await {
                tracing::warn!(error = %e, booking_id = booking.id, "receipt email failed after settlement");
            }
        }
    }
}
