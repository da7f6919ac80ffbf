#![allow(dead_code)]

use hmac::{Hmac, Mac};
use labbaik_settlement::application::settlement::SettlementReconciler;
use labbaik_settlement::domain::agent::{Agent, CommissionType};
use labbaik_settlement::domain::booking::{Booking, BookingStatus};
use labbaik_settlement::domain::package::TravelPackage;
use labbaik_settlement::domain::ports::{AgentStore, BookingStore, PackageStore};
use labbaik_settlement::infrastructure::doubles::{RecordingActivityLog, RecordingNotifier};
use labbaik_settlement::infrastructure::in_memory::{
    InMemoryAgentStore, InMemoryBookingStore, InMemoryPackageStore, InMemoryPaymentStore,
};
use labbaik_settlement::interfaces::webhook::{WebhookEndpoint, WebhookReply};
use rust_decimal_macros::dec;
use sha2::Sha512;

pub const SECRET: &str = "whsec_test_1";
pub const ADMIN_ID: u32 = 77;
pub const ADMIN_EMAIL: &str = "ops@labbaik.test";

pub fn sign_with(secret: &str, body: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha512>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

pub fn sign(body: &[u8]) -> String {
    sign_with(SECRET, body)
}

/// Package 10: plain full-price package, no deposits.
pub fn standard_package() -> TravelPackage {
    TravelPackage {
        id: 10,
        name: "Umrah Standard".to_string(),
        price: dec!(500000),
        agent_discount: None,
        deposit_allowed: false,
        minimum_deposit: None,
    }
}

/// Package 11: deposit-friendly package.
pub fn deposit_package() -> TravelPackage {
    TravelPackage {
        id: 11,
        name: "Hajj Premium".to_string(),
        price: dec!(250000),
        agent_discount: None,
        deposit_allowed: true,
        minimum_deposit: Some(dec!(50000)),
    }
}

/// Agent 9: 10% percentage commission.
pub fn percentage_agent() -> Agent {
    Agent {
        id: 9,
        name: "Al-Safa Travels".to_string(),
        commission_rate: dec!(10),
        commission_type: CommissionType::Percentage,
    }
}

pub fn booking(id: u32, package_id: u32, agent_id: Option<u32>) -> Booking {
    Booking {
        id,
        reference: format!("LBK-{id}"),
        package_id,
        agent_id,
        status: BookingStatus::Pending,
    }
}

pub fn charge_success_body(booking_id: u32, amount_minor: i64, reference: &str) -> Vec<u8> {
    serde_json::json!({
        "event": "charge.success",
        "data": {
            "reference": reference,
            "amount": amount_minor,
            "metadata": {
                "booking_id": booking_id,
                "cancel_action": "https://app.labbaik.test/payment/cancelled"
            },
            "customer": { "email": "pilgrim@example.com" }
        }
    })
    .to_string()
    .into_bytes()
}

pub struct Harness {
    pub bookings: InMemoryBookingStore,
    pub packages: InMemoryPackageStore,
    pub agents: InMemoryAgentStore,
    pub payments: InMemoryPaymentStore,
    pub notifier: RecordingNotifier,
    pub activity: RecordingActivityLog,
    pub endpoint: WebhookEndpoint,
}

pub fn harness() -> Harness {
    let bookings = InMemoryBookingStore::new();
    let packages = InMemoryPackageStore::new();
    let agents = InMemoryAgentStore::new();
    let payments = InMemoryPaymentStore::new();
    let notifier = RecordingNotifier::new();
    let activity = RecordingActivityLog::new();

    let reconciler = SettlementReconciler::new(
        Box::new(bookings.clone()),
        Box::new(packages.clone()),
        Box::new(agents.clone()),
        Box::new(payments.clone()),
        Box::new(notifier.clone()),
        Box::new(activity.clone()),
        SECRET,
    );

    Harness {
        bookings,
        packages,
        agents,
        payments,
        notifier,
        activity,
        endpoint: WebhookEndpoint::new(reconciler),
    }
}

impl Harness {
    /// Seeds the standard scenario: booking 1 on package 10 through agent 9,
    /// which resolves to 450000.
    pub async fn seed_standard(&self) {
        self.packages.store(standard_package()).await.unwrap();
        self.agents.store(percentage_agent()).await.unwrap();
        self.bookings.store(booking(1, 10, Some(9))).await.unwrap();
    }

    /// Dispatches a correctly signed delivery.
    pub async fn deliver(&self, body: &[u8]) -> WebhookReply {
        self.endpoint.dispatch(Some(&sign(body)), body).await
    }
}
