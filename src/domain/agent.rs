use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommissionType {
    Percentage,
    Fixed,
}

/// A booking agent with a prepaid wallet and a commission rule that
/// discounts package list prices for bookings attributed to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: u32,
    pub name: String,
    pub commission_rate: Decimal,
    pub commission_type: CommissionType,
}
