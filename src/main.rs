use clap::Parser;
use labbaik_settlement::application::settlement::SettlementReconciler;
use labbaik_settlement::domain::ports::{
    AgentStore, BookingStore, PackageStore, PaymentStore, PaymentStoreBox,
};
use labbaik_settlement::infrastructure::doubles::{RecordingActivityLog, RecordingNotifier};
use labbaik_settlement::infrastructure::in_memory::{
    InMemoryAgentStore, InMemoryBookingStore, InMemoryPackageStore, InMemoryPaymentStore,
};
#[cfg(feature = "storage-rocksdb")]
use labbaik_settlement::infrastructure::rocksdb::RocksDbLedgerStore;
use labbaik_settlement::interfaces::capture::{CaptureReader, Seed};
use labbaik_settlement::interfaces::webhook::WebhookEndpoint;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::path::PathBuf;

/// Replays captured gateway webhook deliveries against the settlement
/// engine and reports the resulting booking and payment state. Useful for
/// idempotency drills and fraud triage on captured traffic.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Reference data (bookings, packages, agents, payments) as JSON
    seed: PathBuf,

    /// Captured deliveries, one JSON object per line
    capture: PathBuf,

    /// Shared secret used to authenticate delivery signatures
    #[arg(long)]
    secret: String,

    /// Path to a persistent payment ledger (optional). If provided, uses RocksDB.
    #[cfg(feature = "storage-rocksdb")]
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let seed_file = File::open(&cli.seed).into_diagnostic()?;
    let seed = Seed::from_reader(seed_file).into_diagnostic()?;

    let bookings = InMemoryBookingStore::new();
    let packages = InMemoryPackageStore::new();
    let agents = InMemoryAgentStore::new();

    let mut booking_refs = Vec::new();
    for booking in seed.bookings {
        booking_refs.push((booking.id, booking.reference.clone()));
        bookings.store(booking).await.into_diagnostic()?;
    }
    for package in seed.packages {
        packages.store(package).await.into_diagnostic()?;
    }
    for agent in seed.agents {
        agents.store(agent).await.into_diagnostic()?;
    }

    #[cfg(feature = "storage-rocksdb")]
    let (payments, payments_report): (PaymentStoreBox, PaymentStoreBox) =
        if let Some(path) = &cli.db_path {
            let store = RocksDbLedgerStore::open(path).into_diagnostic()?;
            (Box::new(store.clone()), Box::new(store))
        } else {
            let store = InMemoryPaymentStore::new();
            (Box::new(store.clone()), Box::new(store))
        };
    #[cfg(not(feature = "storage-rocksdb"))]
    let (payments, payments_report): (PaymentStoreBox, PaymentStoreBox) = {
        let store = InMemoryPaymentStore::new();
        (Box::new(store.clone()), Box::new(store))
    };

    for payment in seed.payments {
        payments.store(payment).await.into_diagnostic()?;
    }

    let reconciler = SettlementReconciler::new(
        Box::new(bookings.clone()),
        Box::new(packages),
        Box::new(agents),
        payments,
        Box::new(RecordingNotifier::new()),
        Box::new(RecordingActivityLog::new()),
        cli.secret.clone(),
    );
    let endpoint = WebhookEndpoint::new(reconciler);

    let capture = File::open(&cli.capture).into_diagnostic()?;
    for delivery in CaptureReader::new(capture).deliveries() {
        match delivery {
            Ok(delivery) => {
                let reply = endpoint
                    .dispatch(delivery.signature.as_deref(), delivery.body.as_bytes())
                    .await;
                println!("{} {}", reply.status, reply.message);
            }
            Err(e) => {
                eprintln!("Error reading delivery: {e}");
            }
        }
    }

    println!("--- bookings ---");
    for (booking_id, reference) in booking_refs {
        if let Some(booking) = bookings.get(booking_id).await.into_diagnostic()? {
            println!("{reference},{}", booking.status.as_str());
        }
    }
    println!("--- payments ---");
    for payment in payments_report.all().await.into_diagnostic()? {
        println!(
            "{},{},{},{}",
            payment.booking_id,
            payment.method.as_str(),
            payment.status.as_str(),
            payment.amount
        );
    }

    Ok(())
}
