use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletEntryKind {
    Deposit,
    Deduction,
}

/// One row of an agent's wallet ledger.
///
/// The ledger is append-only: rows are never edited or deleted, and the
/// balance is always recomputable as Σdeposits − Σdeductions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: u64,
    pub agent_id: u32,
    pub kind: WalletEntryKind,
    /// Always positive; the kind carries the sign.
    pub amount: Decimal,
    pub reference: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl WalletTransaction {
    /// The row's contribution to the derived balance.
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            WalletEntryKind::Deposit => self.amount,
            WalletEntryKind::Deduction => -self.amount,
        }
    }
}
