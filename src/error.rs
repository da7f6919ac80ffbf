use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Failure taxonomy for the settlement engine.
///
/// The split matters to callers: `Upstream` is the only retryable kind,
/// `AmountMismatch` is surfaced to operators as a fraud signal, and
/// `StateConflict` is kept distinct from `NotFound` so the caller can give a
/// precise message.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("webhook signature is missing or invalid")]
    InvalidSignature,
    #[error("caller is not authorized for this operation")]
    Unauthorized,
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    StateConflict(String),
    #[error("paid amount {paid} does not match expected {expected}")]
    AmountMismatch { paid: Decimal, expected: Decimal },
    #[error("one-time code has expired")]
    Expired,
    #[error("one-time code does not match")]
    CodeMismatch,
    #[error("package price is missing or resolves to a non-positive amount")]
    InvalidPrice,
    #[error("upstream call failed: {0}")]
    Upstream(String),
    #[error("internal error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

impl EngineError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(Box::new(std::io::Error::other(message.into())))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for EngineError {
    fn from(err: rocksdb::Error) -> Self {
        Self::Internal(Box::new(err))
    }
}
