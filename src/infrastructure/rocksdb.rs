use crate::domain::payment::{Payment, PaymentMethod, PaymentStatus};
use crate::domain::ports::{PaymentStore, SettlementApply, WalletStore};
use crate::domain::wallet::WalletTransaction;
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for payment rows, keyed by (booking, method).
pub const CF_PAYMENTS: &str = "payments";
/// Column Family for wallet ledger rows, keyed by sequence number.
pub const CF_WALLET: &str = "wallet";
/// Column Family for sequence counters.
pub const CF_META: &str = "meta";

const PAYMENT_SEQ: &str = "payment_seq";
const WALLET_SEQ: &str = "wallet_seq";

/// Persistent store for the two append-heavy aggregates: payment records and
/// the wallet ledger. Reference data (bookings, packages, agents) stays with
/// the in-memory stores.
///
/// Read-modify-write sections (settlement compare-and-set, sequence bumps)
/// run under a single mutex so concurrent deliveries cannot both apply.
/// `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDbLedgerStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDbLedgerStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_payments = ColumnFamilyDescriptor::new(CF_PAYMENTS, Options::default());
        let cf_wallet = ColumnFamilyDescriptor::new(CF_WALLET, Options::default());
        let cf_meta = ColumnFamilyDescriptor::new(CF_META, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_payments, cf_wallet, cf_meta])?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| EngineError::internal(format!("{name} column family not found")))
    }

    /// Bumps and returns a sequence counter. Callers hold `write_lock`.
    fn next_seq(&self, key: &str) -> Result<u64> {
        let cf = self.cf(CF_META)?;
        let current = match self.db.get_cf(cf, key.as_bytes())? {
            Some(bytes) => u64::from_be_bytes(
                bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| EngineError::internal("corrupt sequence counter"))?,
            ),
            None => 0,
        };
        let next = current + 1;
        self.db.put_cf(cf, key.as_bytes(), next.to_be_bytes())?;
        Ok(next)
    }

    fn payment_key(booking_id: u32, method: PaymentMethod) -> String {
        format!("{booking_id}:{}", method.as_str())
    }

    fn read_payment(&self, booking_id: u32, method: PaymentMethod) -> Result<Option<Payment>> {
        let cf = self.cf(CF_PAYMENTS)?;
        let key = Self::payment_key(booking_id, method);
        match self.db.get_cf(cf, key.as_bytes())? {
            Some(bytes) => {
                let payment = serde_json::from_slice(&bytes)
                    .map_err(|e| EngineError::Internal(Box::new(e)))?;
                Ok(Some(payment))
            }
            None => Ok(None),
        }
    }

    fn write_payment(&self, payment: &Payment) -> Result<()> {
        let cf = self.cf(CF_PAYMENTS)?;
        let key = Self::payment_key(payment.booking_id, payment.method);
        let value =
            serde_json::to_vec(payment).map_err(|e| EngineError::Internal(Box::new(e)))?;
        self.db.put_cf(cf, key.as_bytes(), value)?;
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for RocksDbLedgerStore {
    async fn find(&self, booking_id: u32, method: PaymentMethod) -> Result<Option<Payment>> {
        self.read_payment(booking_id, method)
    }

    async fn has_verified(&self, booking_id: u32, method: PaymentMethod) -> Result<bool> {
        Ok(self
            .read_payment(booking_id, method)?
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
        let _guard = self.write_lock.lock().await;
        match self.read_payment(booking_id, method)? {
            Some(payment) if payment.status == PaymentStatus::Verified => {
                Ok(SettlementApply::AlreadySettled)
            }
            // Pending promotes in place; rejected/refunded rows are
            // superseded under their original id.
            Some(mut payment) => {
                payment.status = PaymentStatus::Verified;
                payment.amount = amount;
                payment.gateway_reference = Some(gateway_reference.to_string());
                payment.verified_at = Some(verified_at);
                self.write_payment(&payment)?;
                Ok(SettlementApply::Applied(payment))
            }
            None => {
                let payment = Payment {
                    id: self.next_seq(PAYMENT_SEQ)?,
                    booking_id,
                    method,
                    amount,
                    status: PaymentStatus::Verified,
                    gateway_reference: Some(gateway_reference.to_string()),
                    verified_at: Some(verified_at),
                };
                self.write_payment(&payment)?;
                Ok(SettlementApply::Applied(payment))
            }
        }
    }

    async fn store(&self, mut payment: Payment) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if payment.id == 0 {
            payment.id = self.next_seq(PAYMENT_SEQ)?;
        }
        self.write_payment(&payment)
    }

    async fn all(&self) -> Result<Vec<Payment>> {
        let cf = self.cf(CF_PAYMENTS)?;
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            let payment: Payment = serde_json::from_slice(&value)
                .map_err(|e| EngineError::Internal(Box::new(e)))?;
            rows.push(payment);
        }
        rows.sort_by_key(|payment| payment.id);
        Ok(rows)
    }
}

#[async_trait]
impl WalletStore for RocksDbLedgerStore {
    async fn append(&self, mut entry: WalletTransaction) -> Result<WalletTransaction> {
        let _guard = self.write_lock.lock().await;
        entry.id = self.next_seq(WALLET_SEQ)?;

        let cf = self.cf(CF_WALLET)?;
        let value =
            serde_json::to_vec(&entry).map_err(|e| EngineError::Internal(Box::new(e)))?;
        self.db.put_cf(cf, entry.id.to_be_bytes(), value)?;
        Ok(entry)
    }

    async fn for_agent(&self, agent_id: u32) -> Result<Vec<WalletTransaction>> {
        let cf = self.cf(CF_WALLET)?;
        let mut entries = Vec::new();
        // Big-endian keys keep the iteration in append order.
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            let entry: WalletTransaction = serde_json::from_slice(&value)
                .map_err(|e| EngineError::Internal(Box::new(e)))?;
            if entry.agent_id == agent_id {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}
