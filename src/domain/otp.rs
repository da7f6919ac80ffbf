use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

/// Codes are fixed-length numeric strings.
pub const OTP_CODE_LEN: usize = 6;
/// A request is discarded this long after issuance.
pub const OTP_TTL_MINUTES: i64 = 15;

/// A pending wallet-credit challenge bound to an (admin, agent, amount)
/// triple.
///
/// The raw code is never persisted; only the salted digest is stored and
/// verification compares digests. Lifecycle: created → consumed | expired.
/// There is no update path other than terminal consumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtpRequest {
    pub id: u64,
    pub admin_id: u32,
    pub agent_id: u32,
    pub amount: Decimal,
    pub salt: String,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
    pub created_at: DateTime<Utc>,
}

/// SHA-512 hex digest of `salt || code`.
pub fn hash_code(salt: &str, code: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(salt.as_bytes());
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

impl OtpRequest {
    /// Constant-time check of a submitted code against the stored digest.
    pub fn matches(&self, code: &str) -> bool {
        let candidate = hash_code(&self.salt, code);
        candidate.as_bytes().ct_eq(self.code_hash.as_bytes()).into()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn request(code: &str) -> OtpRequest {
        let now = Utc::now();
        OtpRequest {
            id: 1,
            admin_id: 1,
            agent_id: 2,
            amount: dec!(500000),
            salt: "ab12".to_string(),
            code_hash: hash_code("ab12", code),
            expires_at: now + Duration::minutes(OTP_TTL_MINUTES),
            consumed: false,
            created_at: now,
        }
    }

    #[test]
    fn test_code_digest_match() {
        let req = request("493021");
        assert!(req.matches("493021"));
        assert!(!req.matches("493022"));
        assert!(!req.matches(""));
    }

    #[test]
    fn test_salt_changes_digest() {
        assert_ne!(hash_code("a", "493021"), hash_code("b", "493021"));
    }

    #[test]
    fn test_expiry() {
        let mut req = request("493021");
        assert!(!req.is_expired(Utc::now()));
        req.expires_at = Utc::now() - Duration::minutes(1);
        assert!(req.is_expired(Utc::now()));
    }
}
