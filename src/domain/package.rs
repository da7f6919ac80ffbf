use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A travel package. Immutable for the duration of a settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelPackage {
    pub id: u32,
    pub name: String,
    /// List price in major currency units.
    pub price: Decimal,
    /// Flat reduction applied when an agent has no usable commission rate.
    #[serde(default)]
    pub agent_discount: Option<Decimal>,
    #[serde(default)]
    pub deposit_allowed: bool,
    /// Absolute deposit amount, required when deposits are allowed.
    #[serde(default)]
    pub minimum_deposit: Option<Decimal>,
}
