#![cfg(feature = "storage-rocksdb")]

mod common;

use common::*;
use labbaik_settlement::application::settlement::SettlementReconciler;
use labbaik_settlement::domain::booking::BookingStatus;
use labbaik_settlement::domain::payment::PaymentMethod;
use labbaik_settlement::domain::ports::{AgentStore, BookingStore, PackageStore, PaymentStore};
use labbaik_settlement::infrastructure::doubles::{RecordingActivityLog, RecordingNotifier};
use labbaik_settlement::infrastructure::in_memory::{
    InMemoryAgentStore, InMemoryBookingStore, InMemoryPackageStore,
};
use labbaik_settlement::infrastructure::rocksdb::RocksDbLedgerStore;
use labbaik_settlement::interfaces::webhook::WebhookEndpoint;
use tempfile::tempdir;

async fn endpoint_at(
    path: &std::path::Path,
) -> (WebhookEndpoint, InMemoryBookingStore, RocksDbLedgerStore) {
    let bookings = InMemoryBookingStore::new();
    let packages = InMemoryPackageStore::new();
    let agents = InMemoryAgentStore::new();
    packages.store(standard_package()).await.unwrap();
    agents.store(percentage_agent()).await.unwrap();
    bookings.store(booking(1, 10, Some(9))).await.unwrap();

    let store = RocksDbLedgerStore::open(path).unwrap();
    let reconciler = SettlementReconciler::new(
        Box::new(bookings.clone()),
        Box::new(packages),
        Box::new(agents),
        Box::new(store.clone()),
        Box::new(RecordingNotifier::new()),
        Box::new(RecordingActivityLog::new()),
        SECRET,
    );
    (WebhookEndpoint::new(reconciler), bookings, store)
}

#[tokio::test]
async fn test_settlement_survives_restart() {
    let dir = tempdir().unwrap();
    let body = charge_success_body(1, 45_000_000, "LBK-1-1700000001");

    {
        let (endpoint, bookings, _store) = endpoint_at(dir.path()).await;
        let reply = endpoint.dispatch(Some(&sign(&body)), &body).await;
        assert_eq!(reply.status, 200);
        assert_eq!(reply.message, "settled");
        let booking = bookings.get(1).await.unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
    }

    // A fresh process replays the same delivery against the same ledger.
    let (endpoint, _bookings, store) = endpoint_at(dir.path()).await;
    let reply = endpoint.dispatch(Some(&sign(&body)), &body).await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.message, "already settled");

    assert!(store.has_verified(1, PaymentMethod::Gateway).await.unwrap());
    assert_eq!(PaymentStore::all(&store).await.unwrap().len(), 1);
}
