use super::wallet::WalletLedger;
use crate::domain::money::Amount;
use crate::domain::otp::{OTP_CODE_LEN, OTP_TTL_MINUTES, OtpRequest, hash_code};
use crate::domain::ports::{
    ActivityLogBox, AgentStoreBox, AuthorizerBox, NotifierBox, OtpStoreBox,
};
use crate::domain::wallet::WalletTransaction;
use crate::error::{EngineError, Result};
use chrono::{Duration, Utc};
use rand::Rng;
use serde_json::json;

/// Who is asking. The email is the admin's own verified address; the code is
/// delivered there and never to the target agent, so controlling the agent's
/// inbox is not enough to self-approve a credit.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    pub user_id: u32,
    pub email: String,
}

/// Challenge-verified wallet credits: issue a short-lived code to the
/// requesting admin, verify it, then append the credit to the agent's
/// ledger.
pub struct OtpChallengeService {
    otps: OtpStoreBox,
    agents: AgentStoreBox,
    authorizer: AuthorizerBox,
    notifier: NotifierBox,
    activity: ActivityLogBox,
    wallet: WalletLedger,
}

impl OtpChallengeService {
    pub fn new(
        otps: OtpStoreBox,
        agents: AgentStoreBox,
        authorizer: AuthorizerBox,
        notifier: NotifierBox,
        activity: ActivityLogBox,
        wallet: WalletLedger,
    ) -> Self {
        Self {
            otps,
            agents,
            authorizer,
            notifier,
            activity,
            wallet,
        }
    }

    /// Issues a challenge for crediting `amount` to `agent_id`.
    ///
    /// The request row is persisted before the email goes out: if dispatch
    /// fails the caller gets a retryable `Upstream` error and may simply
    /// re-request. Expiry bounds the blast radius of orphaned rows.
    pub async fn request_credit(
        &self,
        admin: &AdminAuth,
        agent_id: u32,
        amount: Amount,
    ) -> Result<OtpRequest> {
        self.ensure_admin(admin.user_id).await?;
        let agent = self
            .agents
            .get(agent_id)
            .await?
            .ok_or(EngineError::NotFound("agent"))?;

        let code = generate_code();
        let salt = generate_salt();
        let now = Utc::now();
        let request = self
            .otps
            .create(OtpRequest {
                id: 0,
                admin_id: admin.user_id,
                agent_id,
                amount: amount.value(),
                code_hash: hash_code(&salt, &code),
                salt,
                expires_at: now + Duration::minutes(OTP_TTL_MINUTES),
                consumed: false,
                created_at: now,
            })
            .await?;

        let subject = "Wallet credit confirmation code".to_string();
        let html = format!(
            "<p>Your code to credit {} to {} is <b>{}</b>. It expires in {} minutes.</p>",
            amount, agent.name, code, OTP_TTL_MINUTES
        );
        self.notifier
            .send_email(&admin.email, &subject, &html)
            .await
            .map_err(|e| EngineError::Upstream(format!("email dispatch failed: {e}")))?;

        Ok(request)
    }

    /// Verifies a submitted code and credits the agent's wallet.
    ///
    /// The ledger write happens before the request is marked consumed: if
    /// the credit fails, the row stays unconsumed and the same code drives
    /// exactly one retry. Consumption and credit never diverge the other
    /// way because a consumed row is unfindable on the next attempt.
    pub async fn verify_and_credit(
        &self,
        admin: &AdminAuth,
        agent_id: u32,
        code: &str,
    ) -> Result<WalletTransaction> {
        self.ensure_admin(admin.user_id).await?;

        let request = self
            .otps
            .latest_unconsumed(admin.user_id, agent_id)
            .await?
            .ok_or(EngineError::NotFound("one-time code"))?;
        if request.is_expired(Utc::now()) {
            return Err(EngineError::Expired);
        }
        if !request.matches(code) {
            return Err(EngineError::CodeMismatch);
        }

        let entry = self
            .wallet
            .credit(
                agent_id,
                Amount::new(request.amount)?,
                &format!("OTP-{}", request.id),
                "wallet credit approved via one-time code",
            )
            .await?;

        if !self.otps.consume(request.id).await? {
            tracing::warn!(
                request_id = request.id,
                agent_id,
                "one-time request consumed concurrently after credit"
            );
        }

        if let Err(e) = self
            .activity
            .record(
                Some(admin.user_id),
                "wallet.credited",
                json!({
                    "agent_id": agent_id,
                    "amount": request.amount,
                    "entry_id": entry.id,
                }),
            )
            .await
        {
            tracing::warn!(error = %e, agent_id, "activity record failed after wallet credit");
        }

        Ok(entry)
    }

    async fn ensure_admin(&self, user_id: u32) -> Result<()> {
        if self.authorizer.is_admin(user_id).await? {
            Ok(())
        } else {
            Err(EngineError::Unauthorized)
        }
    }
}

fn generate_code() -> String {
    format!(
        "{:0width$}",
        rand::thread_rng().gen_range(0..1_000_000),
        width = OTP_CODE_LEN
    )
}

fn generate_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}
