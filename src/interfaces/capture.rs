use crate::domain::agent::Agent;
use crate::domain::booking::Booking;
use crate::domain::package::TravelPackage;
use crate::domain::payment::Payment;
use crate::error::{EngineError, Result};
use serde::Deserialize;
use std::io::{BufRead, BufReader, Read};

/// One captured webhook delivery: the signature header and the raw body,
/// byte for byte. The body stays a string because the signature covers the
/// exact bytes the gateway sent; re-serializing would break it.
#[derive(Debug, Clone, Deserialize)]
pub struct CapturedDelivery {
    #[serde(default)]
    pub signature: Option<String>,
    pub body: String,
}

/// Reads captured deliveries from a JSON-lines source.
///
/// Wraps any `Read` and yields `Result<CapturedDelivery>` lazily, so large
/// capture files stream without loading into memory. Blank lines are
/// skipped.
pub struct CaptureReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> CaptureReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: BufReader::new(source),
        }
    }

    pub fn deliveries(self) -> impl Iterator<Item = Result<CapturedDelivery>> {
        self.reader
            .lines()
            .map(|line| -> Result<Option<CapturedDelivery>> {
                let line = line.map_err(|e| EngineError::Internal(Box::new(e)))?;
                if line.trim().is_empty() {
                    return Ok(None);
                }
                let delivery = serde_json::from_str(&line)
                    .map_err(|e| EngineError::Validation(format!("malformed capture line: {e}")))?;
                Ok(Some(delivery))
            })
            .filter_map(|result| result.transpose())
    }
}

/// Reference data loaded before a replay run.
#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub bookings: Vec<Booking>,
    #[serde(default)]
    pub packages: Vec<TravelPackage>,
    #[serde(default)]
    pub agents: Vec<Agent>,
    /// Optional pre-created payment rows (e.g. pending ones).
    #[serde(default)]
    pub payments: Vec<Payment>,
}

impl Seed {
    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        serde_json::from_reader(source)
            .map_err(|e| EngineError::Validation(format!("malformed seed file: {e}")))
    }
}
