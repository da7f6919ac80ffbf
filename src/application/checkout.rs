use crate::domain::money::to_minor_units;
use crate::domain::ports::{
    AgentStoreBox, BookingStoreBox, ChargeRequest, PackageStoreBox, PaymentGatewayBox,
};
use crate::domain::pricing::resolve_price;
use crate::error::{EngineError, Result};
use chrono::Utc;
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub booking_id: u32,
    pub payer_email: String,
    /// Where the gateway sends the payer if they abandon the charge.
    pub cancel_url: String,
}

/// What the caller gets back. `amount` is the server-resolved price; clients
/// never supply or display a figure of their own.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub redirect_url: String,
    pub gateway_reference: String,
    pub amount: Decimal,
}

/// Opens a gateway transaction for a payable booking.
///
/// No payment row is persisted here; the settlement reconciler creates or
/// promotes one when the gateway confirms the charge.
pub struct CheckoutInitiator {
    bookings: BookingStoreBox,
    packages: PackageStoreBox,
    agents: AgentStoreBox,
    gateway: PaymentGatewayBox,
}

impl CheckoutInitiator {
    pub fn new(
        bookings: BookingStoreBox,
        packages: PackageStoreBox,
        agents: AgentStoreBox,
        gateway: PaymentGatewayBox,
    ) -> Self {
        Self {
            bookings,
            packages,
            agents,
            gateway,
        }
    }

    pub async fn initiate(&self, request: CheckoutRequest) -> Result<CheckoutSession> {
        let booking = self
            .bookings
            .get(request.booking_id)
            .await?
            .ok_or(EngineError::NotFound("booking"))?;
        if !booking.is_payable() {
            return Err(EngineError::StateConflict(format!(
                "booking {} is {} and cannot be paid",
                booking.reference,
                booking.status.as_str()
            )));
        }

        let package = self
            .packages
            .get(booking.package_id)
            .await?
            .ok_or(EngineError::NotFound("package"))?;
        let agent = match booking.agent_id {
            Some(agent_id) => self.agents.get(agent_id).await?,
            None => None,
        };

        let amount = resolve_price(&package, agent.as_ref())?;

        // Suffix with a fine-grained timestamp so a retried checkout for the
        // same booking gets a fresh gateway reference.
        let reference = format!("{}-{}", booking.reference, Utc::now().timestamp_micros());
        let session = self
            .gateway
            .initialize(ChargeRequest {
                reference,
                email: request.payer_email,
                amount_minor: to_minor_units(amount)?,
                booking_id: booking.id,
                cancel_url: request.cancel_url,
            })
            .await?;

        Ok(CheckoutSession {
            redirect_url: session.redirect_url,
            gateway_reference: session.reference,
            amount,
        })
    }
}
