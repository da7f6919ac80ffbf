use super::agent::Agent;
use super::booking::{Booking, BookingStatus};
use super::otp::OtpRequest;
use super::package::TravelPackage;
use super::payment::{Payment, PaymentMethod};
use super::wallet::WalletTransaction;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn get(&self, booking_id: u32) -> Result<Option<Booking>>;
    async fn store(&self, booking: Booking) -> Result<()>;
    async fn set_status(&self, booking_id: u32, status: BookingStatus) -> Result<()>;
}

#[async_trait]
pub trait PackageStore: Send + Sync {
    async fn get(&self, package_id: u32) -> Result<Option<TravelPackage>>;
    async fn store(&self, package: TravelPackage) -> Result<()>;
}

#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn get(&self, agent_id: u32) -> Result<Option<Agent>>;
    async fn store(&self, agent: Agent) -> Result<()>;
}

/// Outcome of the conditional settlement write.
#[derive(Debug, Clone, PartialEq)]
pub enum SettlementApply {
    Applied(Payment),
    AlreadySettled,
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn find(&self, booking_id: u32, method: PaymentMethod) -> Result<Option<Payment>>;
    async fn has_verified(&self, booking_id: u32, method: PaymentMethod) -> Result<bool>;
    /// Compare-and-set promotion keyed on (booking, method).
    ///
    /// Exactly one of three shapes holds when this runs: no row (a verified
    /// row is inserted), a pending row (promoted in place), or a verified
    /// row (`AlreadySettled`, no write). The whole decision executes under
    /// one write lock so duplicate deliveries cannot both apply.
    async fn apply_settlement(
        &self,
        booking_id: u32,
        method: PaymentMethod,
        amount: Decimal,
        gateway_reference: &str,
        verified_at: DateTime<Utc>,
    ) -> Result<SettlementApply>;
    async fn store(&self, payment: Payment) -> Result<()>;
    async fn all(&self) -> Result<Vec<Payment>>;
}

#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Persists a new request. The store assigns the id; the value passed
    /// in is ignored.
    async fn create(&self, request: OtpRequest) -> Result<OtpRequest>;
    async fn latest_unconsumed(&self, admin_id: u32, agent_id: u32)
    -> Result<Option<OtpRequest>>;
    /// Marks a request consumed if it is not already. Returns whether this
    /// call performed the transition.
    async fn consume(&self, request_id: u64) -> Result<bool>;
}

#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Appends a ledger row and returns it with its assigned id. The log is
    /// append-only; there is deliberately no update or delete.
    async fn append(&self, entry: WalletTransaction) -> Result<WalletTransaction>;
    async fn for_agent(&self, agent_id: u32) -> Result<Vec<WalletTransaction>>;
}

/// A charge to open with the payment gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeRequest {
    /// Booking reference plus a fine-grained timestamp suffix, so repeated
    /// checkout attempts never collide on the gateway side.
    pub reference: String,
    pub email: String,
    /// Integer minor units.
    pub amount_minor: i64,
    pub booking_id: u32,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewaySession {
    pub redirect_url: String,
    pub reference: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize(&self, charge: ChargeRequest) -> Result<GatewaySession>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<()>;
}

#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn record(
        &self,
        user_id: Option<u32>,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<()>;
}

#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn is_admin(&self, user_id: u32) -> Result<bool>;
}

pub type BookingStoreBox = Box<dyn BookingStore>;
pub type PackageStoreBox = Box<dyn PackageStore>;
pub type AgentStoreBox = Box<dyn AgentStore>;
pub type PaymentStoreBox = Box<dyn PaymentStore>;
pub type OtpStoreBox = Box<dyn OtpStore>;
pub type WalletStoreBox = Box<dyn WalletStore>;
pub type PaymentGatewayBox = Box<dyn PaymentGateway>;
pub type NotifierBox = Box<dyn Notifier>;
pub type ActivityLogBox = Box<dyn ActivityLog>;
pub type AuthorizerBox = Box<dyn Authorizer>;
