//! CRUD over the lock's keypad authorizations.
//!
//! Only entries of the keypad-code type whose name carries the configured
//! prefix are considered ours; everything else on the lock is left alone.

use std::sync::Arc;

use chrono::Utc;
use nuki_otp_core::models::AUTH_TYPE_KEYPAD_CODE;
use nuki_otp_core::otp::{self, ValidityWindow, ALL_WEEK_DAYS};
use nuki_otp_core::types::{SmartlockId, Timestamp};
use nuki_otp_core::{AuthCode, Lock, OtpConfig};
use reqwest::Method;
use serde::Serialize;

use crate::error::NukiResult;
use crate::resolver::LockResolver;
use crate::transport::NukiTransport;

/// Path for listing, creating and deleting authorizations.
pub const AUTHS_PATH: &str = "smartlock/auth";

/// Log action code for an unlock.
pub const LOG_ACTION_UNLOCK: u8 = 1;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Body of `PUT /smartlock/auth`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateAuthRequest<'a> {
    name: &'a str,
    #[serde(rename = "start_date")]
    start_date: String,
    #[serde(rename = "end_date")]
    end_date: String,
    allowed_week_days: u8,
    allowed_from_time: u32,
    allowed_until_time: u32,
    smartlock_ids: [SmartlockId; 1],
    remote_allowed: bool,
    smart_actions_enabled: bool,
    #[serde(rename = "type")]
    auth_type: u8,
    code: u32,
}

/// Body of `DELETE /smartlock/auth`.
#[derive(Debug, Serialize)]
struct DeleteAuthsRequest<'a> {
    ids: Vec<&'a str>,
}

// ---------------------------------------------------------------------------
// IssuedCode
// ---------------------------------------------------------------------------

/// A code accepted by the lock cloud.
///
/// The create call answers without an identifier, so this carries what was
/// submitted; the matching [`AuthCode`] shows up in the next listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCode {
    pub smartlock_id: SmartlockId,
    pub name: String,
    pub code: u32,
    pub window: ValidityWindow,
}

impl IssuedCode {
    pub fn starts_at(&self) -> Timestamp {
        self.window.start
    }

    pub fn ends_at(&self) -> Timestamp {
        self.window.end
    }
}

// ---------------------------------------------------------------------------
// CodeRepository
// ---------------------------------------------------------------------------

/// Remote store of one-time codes for the configured lock.
#[derive(Clone)]
pub struct CodeRepository {
    transport: Arc<NukiTransport>,
    config: Arc<OtpConfig>,
    resolver: LockResolver,
}

impl CodeRepository {
    pub fn new(transport: Arc<NukiTransport>, config: Arc<OtpConfig>) -> Self {
        let resolver = LockResolver::new(Arc::clone(&transport));
        Self {
            transport,
            config,
            resolver,
        }
    }

    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    pub fn resolver(&self) -> &LockResolver {
        &self.resolver
    }

    /// Resolve the configured lock.
    pub async fn target_lock(&self) -> NukiResult<Lock> {
        self.resolver.resolve(&self.config.lock_name).await
    }

    /// List our codes in the order the API returns them.
    pub async fn list_codes(&self) -> NukiResult<Vec<AuthCode>> {
        let path = format!("{AUTHS_PATH}?type={AUTH_TYPE_KEYPAD_CODE}");
        let entries: Vec<AuthCode> = self.transport.fetch_all(&path).await?;
        let prefix = &self.config.code_prefix;

        Ok(entries
            .into_iter()
            .filter(|entry| entry.has_prefix(prefix))
            .collect())
    }

    /// Create a fresh code on the configured lock, valid from now for the
    /// configured lifetime, every day and at any time.
    pub async fn create_code(&self) -> NukiResult<IssuedCode> {
        let lock = self.target_lock().await?;
        self.create_code_on(&lock, Utc::now()).await
    }

    /// Create a code on an already resolved lock with the window opening at `now`.
    pub async fn create_code_on(&self, lock: &Lock, now: Timestamp) -> NukiResult<IssuedCode> {
        let window = ValidityWindow::starting_at(now, self.config.lifetime_hours);
        let code = otp::generate_code();
        let name = self.config.code_name();

        let request = CreateAuthRequest {
            name: &name,
            start_date: window.start_param(),
            end_date: window.end_param(),
            allowed_week_days: ALL_WEEK_DAYS,
            allowed_from_time: 0,
            allowed_until_time: 0,
            smartlock_ids: [lock.id],
            remote_allowed: true,
            smart_actions_enabled: false,
            auth_type: AUTH_TYPE_KEYPAD_CODE,
            code,
        };
        let body = serde_json::to_value(&request)?;

        self.transport
            .execute(Method::PUT, AUTHS_PATH, Some(&body))
            .await?;

        tracing::info!(
            smartlock_id = lock.id,
            name = %name,
            end = %request.end_date,
            "One-time code created"
        );

        Ok(IssuedCode {
            smartlock_id: lock.id,
            name,
            code,
            window,
        })
    }

    /// Delete the given codes in a single request. Empty input is a no-op.
    pub async fn delete_codes(&self, codes: &[AuthCode]) -> NukiResult<()> {
        if codes.is_empty() {
            return Ok(());
        }

        let request = DeleteAuthsRequest {
            ids: codes.iter().map(|c| c.id.as_str()).collect(),
        };
        let body = serde_json::to_value(&request)?;

        self.transport
            .execute(Method::DELETE, AUTHS_PATH, Some(&body))
            .await?;

        tracing::info!(ids = ?request.ids, "One-time codes deleted");
        Ok(())
    }

    /// Unlock events on `lock` attributed to the authorization `auth_id`.
    ///
    /// Only the first page is fetched; callers only care whether any exist.
    pub async fn unlock_log(
        &self,
        lock: &Lock,
        auth_id: &str,
    ) -> NukiResult<Vec<serde_json::Value>> {
        let path = format!(
            "smartlock/{}/log?action={LOG_ACTION_UNLOCK}&authId={auth_id}",
            lock.id
        );
        self.transport.fetch_first_page(&path).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
