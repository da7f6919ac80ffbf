use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

/// A booking as seen by the settlement core.
///
/// Owned by the booking-management collaborator; this crate only reads the
/// package/agent linkage and drives the pending → confirmed transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: u32,
    /// Human-facing reference code, e.g. "LBK-1042".
    pub reference: String,
    pub package_id: u32,
    pub agent_id: Option<u32>,
    pub status: BookingStatus,
}

impl Booking {
    /// A booking accepts payments only while pending.
    pub fn is_payable(&self) -> bool {
        self.status == BookingStatus::Pending
    }
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}
