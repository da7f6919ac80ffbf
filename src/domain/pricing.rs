use super::agent::{Agent, CommissionType};
use super::package::TravelPackage;
use crate::error::{EngineError, Result};
use rust_decimal::Decimal;

/// Computes the authoritative amount owed for a booking.
///
/// Both checkout and webhook verification call this; pricing is never
/// recomputed inline anywhere else, so the two sites agree bit for bit.
///
/// Branch order matches the production rule set: a fixed commission is a
/// flat reduction, a positive percentage rate scales the list price, and a
/// percentage agent with zero rate falls back to the package's flat
/// `agent_discount`.
pub fn resolve_price(package: &TravelPackage, agent: Option<&Agent>) -> Result<Decimal> {
    if package.price <= Decimal::ZERO {
        return Err(EngineError::InvalidPrice);
    }

    let due = match agent {
        None => package.price,
        Some(agent) => match agent.commission_type {
            CommissionType::Fixed => (package.price - agent.commission_rate).max(Decimal::ZERO),
            CommissionType::Percentage if agent.commission_rate > Decimal::ZERO => {
                package.price * (Decimal::ONE - agent.commission_rate / Decimal::ONE_HUNDRED)
            }
            CommissionType::Percentage => {
                let discount = package.agent_discount.unwrap_or(Decimal::ZERO);
                (package.price - discount).max(Decimal::ZERO)
            }
        },
    };

    if due <= Decimal::ZERO {
        return Err(EngineError::InvalidPrice);
    }
    Ok(due)
}
