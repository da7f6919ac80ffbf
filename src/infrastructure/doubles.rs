//! Deterministic collaborator implementations.
//!
//! These stand in for the real gateway, mailer, authorization service and
//! activity sink in tests and in the replay binary. The recording variants
//! expose what flowed through them so exactly-once side effects can be
//! asserted.

use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::ports::{
    ActivityLog, Authorizer, BookingStore, ChargeRequest, GatewaySession, Notifier,
    PaymentGateway, WalletStore,
};
use crate::domain::wallet::WalletTransaction;
use crate::error::{EngineError, Result};
use crate::infrastructure::in_memory::{InMemoryBookingStore, InMemoryWalletStore};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Gateway stand-in: accepts every charge and hands back a predictable
/// redirect for the submitted reference.
#[derive(Default, Clone)]
pub struct FakeGateway {
    pub charges: Arc<RwLock<Vec<ChargeRequest>>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn initialize(&self, charge: ChargeRequest) -> Result<GatewaySession> {
        let session = GatewaySession {
            redirect_url: format!("https://gateway.test/checkout/{}", charge.reference),
            reference: charge.reference.clone(),
        };
        self.charges.write().await.push(charge);
        Ok(session)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Mailer that records every send, and can be told to fail.
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    pub sent: Arc<RwLock<Vec<SentEmail>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::Relaxed);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<()> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(EngineError::Upstream("smtp unavailable".to_string()));
        }
        self.sent.write().await.push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub user_id: Option<u32>,
    pub event: String,
    pub payload: serde_json::Value,
}

#[derive(Default, Clone)]
pub struct RecordingActivityLog {
    pub events: Arc<RwLock<Vec<RecordedEvent>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::Relaxed);
    }

    pub async fn events_named(&self, event: &str) -> Vec<RecordedEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|recorded| recorded.event == event)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ActivityLog for RecordingActivityLog {
    async fn record(
        &self,
        user_id: Option<u32>,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<()> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(EngineError::Upstream("activity sink unavailable".to_string()));
        }
        self.events.write().await.push(RecordedEvent {
            user_id,
            event: event.to_string(),
            payload,
        });
        Ok(())
    }
}

/// Authorization check backed by a fixed admin set.
#[derive(Default, Clone)]
pub struct StaticAuthorizer {
    admins: Arc<HashSet<u32>>,
}

impl StaticAuthorizer {
    pub fn with_admins(admin_ids: &[u32]) -> Self {
        Self {
            admins: Arc::new(admin_ids.iter().copied().collect()),
        }
    }
}

#[async_trait]
impl Authorizer for StaticAuthorizer {
    async fn is_admin(&self, user_id: u32) -> Result<bool> {
        Ok(self.admins.contains(&user_id))
    }
}

/// Booking store whose next status write can be made to fail once, for
/// exercising redelivery recovery of the booking promotion.
#[derive(Default, Clone)]
pub struct FlakyBookingStore {
    inner: InMemoryBookingStore,
    fail_next: Arc<AtomicBool>,
}

impl FlakyBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_set_status(&self) {
        self.fail_next.store(true, Ordering::Relaxed);
    }
}

#[async_trait]
impl BookingStore for FlakyBookingStore {
    async fn get(&self, booking_id: u32) -> Result<Option<Booking>> {
        self.inner.get(booking_id).await
    }

    async fn store(&self, booking: Booking) -> Result<()> {
        self.inner.store(booking).await
    }

    async fn set_status(&self, booking_id: u32, status: BookingStatus) -> Result<()> {
        if self.fail_next.swap(false, Ordering::Relaxed) {
            return Err(EngineError::Upstream("booking store unavailable".to_string()));
        }
        self.inner.set_status(booking_id, status).await
    }
}

/// Wallet store whose next append can be made to fail once, for exercising
/// the verify-then-credit retry contract.
#[derive(Default, Clone)]
pub struct FlakyWalletStore {
    inner: InMemoryWalletStore,
    fail_next: Arc<AtomicBool>,
}

impl FlakyWalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_append(&self) {
        self.fail_next.store(true, Ordering::Relaxed);
    }
}

#[async_trait]
impl WalletStore for FlakyWalletStore {
    async fn append(&self, entry: WalletTransaction) -> Result<WalletTransaction> {
        if self.fail_next.swap(false, Ordering::Relaxed) {
            return Err(EngineError::Upstream("ledger write failed".to_string()));
        }
        self.inner.append(entry).await
    }

    async fn for_agent(&self, agent_id: u32) -> Result<Vec<WalletTransaction>> {
        self.inner.for_agent(agent_id).await
    }
}
