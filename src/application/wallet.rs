use crate::domain::money::Amount;
use crate::domain::ports::WalletStoreBox;
use crate::domain::wallet::{WalletEntryKind, WalletTransaction};
use crate::error::Result;
use chrono::Utc;
use rust_decimal::Decimal;

/// Append-only wallet ledger with a derived balance.
///
/// `debit` does not enforce a non-negative balance: overdraft policy belongs
/// to the caller (e.g. a pay-by-wallet flow that checks funds first). The
/// positive-amount rule is enforced by the `Amount` type at the boundary.
pub struct WalletLedger {
    store: WalletStoreBox,
}

impl WalletLedger {
    pub fn new(store: WalletStoreBox) -> Self {
        Self { store }
    }

    pub async fn credit(
        &self,
        agent_id: u32,
        amount: Amount,
        reference: &str,
        description: &str,
    ) -> Result<WalletTransaction> {
        self.append(agent_id, WalletEntryKind::Deposit, amount, reference, description)
            .await
    }

    pub async fn debit(
        &self,
        agent_id: u32,
        amount: Amount,
        reference: &str,
        description: &str,
    ) -> Result<WalletTransaction> {
        self.append(agent_id, WalletEntryKind::Deduction, amount, reference, description)
            .await
    }

    /// Σdeposits − Σdeductions, computed from the log on every read.
    pub async fn balance(&self, agent_id: u32) -> Result<Decimal> {
        Ok(self
            .store
            .for_agent(agent_id)
            .await?
            .iter()
            .map(WalletTransaction::signed_amount)
            .sum())
    }

    pub async fn history(&self, agent_id: u32) -> Result<Vec<WalletTransaction>> {
        self.store.for_agent(agent_id).await
    }

    async fn append(
        &self,
        agent_id: u32,
        kind: WalletEntryKind,
        amount: Amount,
        reference: &str,
        description: &str,
    ) -> Result<WalletTransaction> {
        self.store
            .append(WalletTransaction {
                id: 0,
                agent_id,
                kind,
                amount: amount.value(),
                reference: reference.to_string(),
                description: description.to_string(),
                created_at: Utc::now(),
            })
            .await
    }
}
