//! Periodic cleanup of expired or already used codes.
//!
//! [`Housekeeper::run`] never fails: any error is logged and the pass
//! simply deletes nothing, leaving the next scheduled pass to try again.

use chrono::Utc;
use nuki_otp_core::AuthCode;

use crate::evaluator::CodeEvaluator;
use crate::repository::CodeRepository;

/// What a single housekeeping pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HousekeepingReport {
    /// Number of our codes seen in the listing.
    pub inspected: usize,
    /// Identifiers removed in this pass.
    pub deleted: Vec<String>,
}

/// Reconciles the remote code list with the expiry and usage rules.
#[derive(Clone)]
pub struct Housekeeper {
    repository: CodeRepository,
    evaluator: CodeEvaluator,
}

impl Housekeeper {
    pub fn new(repository: CodeRepository, evaluator: CodeEvaluator) -> Self {
        Self {
            repository,
            evaluator,
        }
    }

    /// Delete every code that is expired or used, in one batched request.
    ///
    /// Only codes present in this pass's listing are candidates, so a code
    /// created while the pass is running is never touched.
    pub async fn run(&self) -> HousekeepingReport {
        let codes = match self.repository.list_codes().await {
            Ok(codes) => codes,
            Err(e) => {
                tracing::error!(error = %e, "Housekeeping could not list codes");
                return HousekeepingReport::default();
            }
        };

        let mut report = HousekeepingReport {
            inspected: codes.len(),
            deleted: Vec::new(),
        };
        if codes.is_empty() {
            return report;
        }

        let stale = self.select_stale(codes).await;
        if stale.is_empty() {
            tracing::debug!(inspected = report.inspected, "Housekeeping found nothing to delete");
            return report;
        }

        match self.repository.delete_codes(&stale).await {
            Ok(()) => {
                report.deleted = stale.into_iter().map(|c| c.id).collect();
                tracing::info!(deleted = ?report.deleted, "Housekeeping removed stale codes");
            }
            Err(e) => {
                tracing::error!(error = %e, count = stale.len(), "Housekeeping delete failed");
            }
        }

        report
    }

    /// Pick the codes that are expired or used.
    ///
    /// The lock is resolved once per pass. If that fails, usage cannot be
    /// checked and only expiry decides.
    async fn select_stale(&self, codes: Vec<AuthCode>) -> Vec<AuthCode> {
        let lock = match self.repository.target_lock().await {
            Ok(lock) => Some(lock),
            Err(e) => {
                tracing::warn!(error = %e, "Housekeeping skipping usage checks");
                None
            }
        };

        let now = Utc::now();
        let mut stale = Vec::new();

        for code in codes {
            let expired = self.evaluator.is_expired_at(&code, now);
            let used = match (&lock, expired) {
                (_, true) | (None, _) => false,
                (Some(lock), false) => self.evaluator.is_used_on(lock, &code).await,
            };

            tracing::debug!(name = %code.name, auth_id = %code.id, expired, used, "Housekeeping checked code");

            if expired || used {
                stale.push(code);
            }
        }

        stale
    }
}
