use crate::error::{EngineError, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A positive monetary amount in major currency units.
///
/// This is a wrapper around `rust_decimal::Decimal` used wherever a zero or
/// negative value is a caller error (wallet movements, credit requests).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(EngineError::Validation(
                "amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = EngineError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Minor units per major unit (e.g. kobo per naira).
const MINOR_PER_MAJOR: Decimal = Decimal::ONE_HUNDRED;

/// Converts a major-unit amount to integer minor units for the gateway,
/// rounding half-up.
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
    (amount * MINOR_PER_MAJOR)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| EngineError::Validation("amount out of range for minor units".to_string()))
}

/// Converts a gateway-reported minor-unit amount back to major units.
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::from(minor) / MINOR_PER_MAJOR
}

/// Flat matching window: a paid amount matches an expected one when they
/// differ by less than one major currency unit. Absorbs rounding drift on
/// the gateway side, never a real discrepancy.
pub fn within_tolerance(paid: Decimal, expected: Decimal) -> bool {
    (paid - expected).abs() < Decimal::ONE
}
