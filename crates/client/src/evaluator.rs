//! Expiry and usage checks for existing codes.

use chrono::Utc;
use nuki_otp_core::otp;
use nuki_otp_core::types::Timestamp;
use nuki_otp_core::{AuthCode, Lock};

use crate::error::NukiResult;
use crate::repository::CodeRepository;

/// Decides whether a code should still exist.
#[derive(Clone)]
pub struct CodeEvaluator {
    repository: CodeRepository,
}

impl CodeEvaluator {
    pub fn new(repository: CodeRepository) -> Self {
        Self { repository }
    }

    /// Whether the code has outlived the configured lifetime.
    pub fn is_expired(&self, code: &AuthCode) -> bool {
        self.is_expired_at(code, Utc::now())
    }

    pub fn is_expired_at(&self, code: &AuthCode, now: Timestamp) -> bool {
        let expired = otp::is_expired_at(code, now, self.repository.config().lifetime_hours);
        if expired {
            tracing::info!(auth_id = %code.id, name = %code.name, "Code expired");
        }
        expired
    }

    /// Whether the lock recorded an unlock with this code.
    ///
    /// Lookup failures are logged and reported as "not used"; expiry still
    /// applies independently.
    pub async fn is_used(&self, code: &AuthCode) -> bool {
        match self.repository.target_lock().await {
            Ok(lock) => self.is_used_on(&lock, code).await,
            Err(e) => {
                tracing::warn!(auth_id = %code.id, error = %e, "Could not resolve lock for usage check");
                false
            }
        }
    }

    /// Usage check against an already resolved lock.
    pub async fn is_used_on(&self, lock: &Lock, code: &AuthCode) -> bool {
        match self.repository.unlock_log(lock, &code.id).await {
            Ok(entries) if entries.is_empty() => false,
            Ok(entries) => {
                tracing::info!(
                    auth_id = %code.id,
                    name = %code.name,
                    unlocks = entries.len(),
                    "Code used"
                );
                true
            }
            Err(e) => {
                tracing::warn!(auth_id = %code.id, error = %e, "Usage log lookup failed");
                false
            }
        }
    }

    /// Whether `entered` matches one of our codes that is neither expired
    /// nor used.
    ///
    /// Unlike the housekeeping checks, lookup failures are returned so an
    /// undeterminable code is never reported as valid.
    pub async fn verify(&self, entered: u32) -> NukiResult<bool> {
        let codes = self.repository.list_codes().await?;
        let now = Utc::now();
        let candidates: Vec<&AuthCode> = codes
            .iter()
            .filter(|c| c.code == Some(entered) && !self.is_expired_at(c, now))
            .collect();

        if candidates.is_empty() {
            return Ok(false);
        }

        let lock = self.repository.target_lock().await?;
        for code in candidates {
            if self.repository.unlock_log(&lock, &code.id).await?.is_empty() {
                return Ok(true);
            }
        }

        Ok(false)
    }
}
