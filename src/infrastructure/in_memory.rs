use crate::domain::agent::Agent;
use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::otp::OtpRequest;
use crate::domain::package::TravelPackage;
use crate::domain::payment::{Payment, PaymentMethod, PaymentStatus};
use crate::domain::ports::{
    AgentStore, BookingStore, OtpStore, PackageStore, PaymentStore, SettlementApply, WalletStore,
};
use crate::domain::wallet::WalletTransaction;
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Thread-safe in-memory stores backing tests and the replay binary.
///
/// Each store is `Arc<RwLock<..>>` so clones share state; compare-and-set
/// operations take the write lock for the whole decision.
#[derive(Default, Clone)]
pub struct InMemoryBookingStore {
    bookings: Arc<RwLock<HashMap<u32, Booking>>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn get(&self, booking_id: u32) -> Result<Option<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings.get(&booking_id).cloned())
    }

    async fn store(&self, booking: Booking) -> Result<()> {
        let mut bookings = self.bookings.write().await;
        bookings.insert(booking.id, booking);
        Ok(())
    }

    async fn set_status(&self, booking_id: u32, status: BookingStatus) -> Result<()> {
        let mut bookings = self.bookings.write().await;
        let booking = bookings
            .get_mut(&booking_id)
            .ok_or(EngineError::NotFound("booking"))?;
        booking.status = status;
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryPackageStore {
    packages: Arc<RwLock<HashMap<u32, TravelPackage>>>,
}

impl InMemoryPackageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PackageStore for InMemoryPackageStore {
    async fn get(&self, package_id: u32) -> Result<Option<TravelPackage>> {
        let packages = self.packages.read().await;
        Ok(packages.get(&package_id).cloned())
    }

    async fn store(&self, package: TravelPackage) -> Result<()> {
        let mut packages = self.packages.write().await;
        packages.insert(package.id, package);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryAgentStore {
    agents: Arc<RwLock<HashMap<u32, Agent>>>,
}

impl InMemoryAgentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentStore for InMemoryAgentStore {
    async fn get(&self, agent_id: u32) -> Result<Option<Agent>> {
        let agents = self.agents.read().await;
        Ok(agents.get(&agent_id).cloned())
    }

    async fn store(&self, agent: Agent) -> Result<()> {
        let mut agents = self.agents.write().await;
        agents.insert(agent.id, agent);
        Ok(())
    }
}

/// Payments keyed by (booking, method): the map key itself enforces the
/// one-row-per-pair invariant that anchors idempotency.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<(u32, PaymentMethod), Payment>>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn assign_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn find(&self, booking_id: u32, method: PaymentMethod) -> Result<Option<Payment>> {
        let payments = self.payments.read().await;
        Ok(payments.get(&(booking_id, method)).cloned())
    }

    async fn has_verified(&self, booking_id: u32, method: PaymentMethod) -> Result<bool> {
        let payments = self.payments.read().await;
        Ok(payments
            .get(&(booking_id, method))
            .is_some_and(|payment| payment.status == PaymentStatus::Verified))
    }

    async fn apply_settlement(
        &self,
        booking_id: u32,
        method: PaymentMethod,
        amount: Decimal,
        gateway_reference: &str,
        verified_at: DateTime<Utc>,
    ) -> Result<SettlementApply> {
        let mut payments = self.payments.write().await;
        if let Some(payment) = payments.get_mut(&(booking_id, method)) {
            if payment.status == PaymentStatus::Verified {
                return Ok(SettlementApply::AlreadySettled);
            }
            // Pending rows promote in place. A rejected or refunded row
            // does not block a fresh settlement either: it is superseded
            // under its original id, so the record keeps its identity.
            payment.status = PaymentStatus::Verified;
            payment.amount = amount;
            payment.gateway_reference = Some(gateway_reference.to_string());
            payment.verified_at = Some(verified_at);
            return Ok(SettlementApply::Applied(payment.clone()));
        }

        let payment = Payment {
            id: self.assign_id(),
            booking_id,
            method,
            amount,
            status: PaymentStatus::Verified,
            gateway_reference: Some(gateway_reference.to_string()),
            verified_at: Some(verified_at),
        };
        payments.insert((booking_id, method), payment.clone());
        Ok(SettlementApply::Applied(payment))
    }

    async fn store(&self, mut payment: Payment) -> Result<()> {
        if payment.id == 0 {
            payment.id = self.assign_id();
        }
        let mut payments = self.payments.write().await;
        payments.insert((payment.booking_id, payment.method), payment);
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Payment>> {
        let payments = self.payments.read().await;
        let mut rows: Vec<Payment> = payments.values().cloned().collect();
        rows.sort_by_key(|payment| payment.id);
        Ok(rows)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryOtpStore {
    requests: Arc<RwLock<Vec<OtpRequest>>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a fully-built request, e.g. one that is already expired.
    pub async fn insert_raw(&self, request: OtpRequest) {
        self.requests.write().await.push(request);
    }
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn create(&self, mut request: OtpRequest) -> Result<OtpRequest> {
        request.id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut requests = self.requests.write().await;
        requests.push(request.clone());
        Ok(request)
    }

    async fn latest_unconsumed(
        &self,
        admin_id: u32,
        agent_id: u32,
    ) -> Result<Option<OtpRequest>> {
        let requests = self.requests.read().await;
        Ok(requests
            .iter()
            .rev()
            .find(|request| {
                request.admin_id == admin_id
                    && request.agent_id == agent_id
                    && !request.consumed
            })
            .cloned())
    }

    async fn consume(&self, request_id: u64) -> Result<bool> {
        let mut requests = self.requests.write().await;
        match requests.iter_mut().find(|request| request.id == request_id) {
            Some(request) if !request.consumed => {
                request.consumed = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Default, Clone)]
pub struct InMemoryWalletStore {
    entries: Arc<RwLock<Vec<WalletTransaction>>>,
    next_id: Arc<AtomicU64>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn append(&self, mut entry: WalletTransaction) -> Result<WalletTransaction> {
        entry.id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut entries = self.entries.write().await;
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn for_agent(&self, agent_id: u32) -> Result<Vec<WalletTransaction>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|entry| entry.agent_id == agent_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_apply_settlement_is_single_shot() {
        let store = InMemoryPaymentStore::new();
        let now = Utc::now();

        let first = store
            .apply_settlement(1, PaymentMethod::Gateway, dec!(450000), "LBK-1-17", now)
            .await
            .unwrap();
        assert!(matches!(first, SettlementApply::Applied(_)));

        let second = store
            .apply_settlement(1, PaymentMethod::Gateway, dec!(450000), "LBK-1-18", now)
            .await
            .unwrap();
        assert_eq!(second, SettlementApply::AlreadySettled);

        assert_eq!(store.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_apply_settlement_promotes_pending_row() {
        let store = InMemoryPaymentStore::new();
        store
            .store(Payment {
                id: 0,
                booking_id: 1,
                method: PaymentMethod::Gateway,
                amount: dec!(450000),
                status: PaymentStatus::Pending,
                gateway_reference: None,
                verified_at: None,
            })
            .await
            .unwrap();
        let existing = store.find(1, PaymentMethod::Gateway).await.unwrap().unwrap();

        let now = Utc::now();
        let applied = store
            .apply_settlement(1, PaymentMethod::Gateway, dec!(450000), "LBK-1-17", now)
            .await
            .unwrap();
        let SettlementApply::Applied(payment) = applied else {
            panic!("expected promotion of the pending row");
        };
        // Same row, promoted in place.
        assert_eq!(payment.id, existing.id);
        assert_eq!(payment.status, PaymentStatus::Verified);
        assert_eq!(payment.verified_at, Some(now));
        assert!(store.has_verified(1, PaymentMethod::Gateway).await.unwrap());
    }

    #[tokio::test]
    async fn test_apply_settlement_supersedes_rejected_row_in_place() {
        let store = InMemoryPaymentStore::new();
        store
            .store(Payment {
                id: 0,
                booking_id: 1,
                method: PaymentMethod::Gateway,
                amount: dec!(450000),
                status: PaymentStatus::Rejected,
                gateway_reference: Some("LBK-1-10".to_string()),
                verified_at: None,
            })
            .await
            .unwrap();
        let prior = store.find(1, PaymentMethod::Gateway).await.unwrap().unwrap();

        let now = Utc::now();
        let applied = store
            .apply_settlement(1, PaymentMethod::Gateway, dec!(450000), "LBK-1-17", now)
            .await
            .unwrap();
        let SettlementApply::Applied(payment) = applied else {
            panic!("expected the rejected row to be superseded");
        };
        assert_eq!(payment.id, prior.id);
        assert_eq!(payment.status, PaymentStatus::Verified);
        assert_eq!(payment.gateway_reference.as_deref(), Some("LBK-1-17"));
        assert_eq!(store.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_otp_consume_is_single_use() {
        let store = InMemoryOtpStore::new();
        let request = store
            .create(OtpRequest {
                id: 0,
                admin_id: 1,
                agent_id: 2,
                amount: dec!(500000),
                salt: "s".to_string(),
                code_hash: "h".to_string(),
                expires_at: Utc::now(),
                consumed: false,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        assert!(store.consume(request.id).await.unwrap());
        assert!(!store.consume(request.id).await.unwrap());
        assert!(store.latest_unconsumed(1, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_unconsumed_picks_most_recent() {
        let store = InMemoryOtpStore::new();
        for _ in 0..2 {
            store
                .create(OtpRequest {
                    id: 0,
                    admin_id: 1,
                    agent_id: 2,
                    amount: dec!(1000),
                    salt: "s".to_string(),
                    code_hash: "h".to_string(),
                    expires_at: Utc::now(),
                    consumed: false,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        let latest = store.latest_unconsumed(1, 2).await.unwrap().unwrap();
        assert_eq!(latest.id, 2);
        assert!(store.latest_unconsumed(1, 3).await.unwrap().is_none());
    }
}
