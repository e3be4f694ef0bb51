//! Setup-time validation of a configuration against the live API.
//!
//! Failures are folded into the few categories a setup form can show:
//! bad credentials, unreachable service, or unknown lock. A configuration
//! rejected locally never reaches the API and gets its own category.

use std::sync::Arc;

use nuki_otp_core::types::SmartlockId;
use nuki_otp_core::OtpConfig;

use crate::error::NukiError;
use crate::repository::CodeRepository;
use crate::transport::{NukiTransport, RetryPolicy};

/// Form field that carries general errors.
pub const FIELD_BASE: &str = "base";

/// Form field for the lock name.
pub const FIELD_LOCK_NAME: &str = "lock_name";

/// User-facing setup failure.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("Invalid API token")]
    InvalidAuth,

    #[error("Cannot connect to the Nuki API: {0}")]
    CannotConnect(String),

    #[error("Smartlock '{0}' not found")]
    LockNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SetupError {
    /// Form field the error is attached to.
    pub fn field(&self) -> &'static str {
        match self {
            SetupError::LockNotFound(_) => FIELD_LOCK_NAME,
            _ => FIELD_BASE,
        }
    }

    /// Stable key a form renders into a translated message.
    pub fn key(&self) -> &'static str {
        match self {
            SetupError::InvalidAuth => "invalid_auth",
            SetupError::CannotConnect(_) => "cannot_connect",
            SetupError::LockNotFound(_) => "lock_not_found",
            SetupError::InvalidConfig(_) => "invalid_config",
        }
    }
}

impl From<NukiError> for SetupError {
    fn from(e: NukiError) -> Self {
        match e {
            NukiError::Authentication { .. } => SetupError::InvalidAuth,
            NukiError::LockNotFound { name } => SetupError::LockNotFound(name),
            NukiError::Config(inner) => SetupError::InvalidConfig(inner.to_string()),
            // Any other failure means the service did not answer usefully.
            NukiError::Timeout { .. }
            | NukiError::Transport { .. }
            | NukiError::Api { .. }
            | NukiError::Json(_) => SetupError::CannotConnect(e.to_string()),
        }
    }
}

/// Details of a configuration that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupInfo {
    pub title: String,
    pub smartlock_id: SmartlockId,
    /// Identifier that keeps one entry per lock.
    pub unique_id: String,
}

/// Check that the token works, the lock exists and its codes can be listed.
pub async fn validate_setup(config: OtpConfig, policy: RetryPolicy) -> Result<SetupInfo, SetupError> {
    config
        .check()
        .map_err(|e| SetupError::InvalidConfig(e.to_string()))?;

    let transport = Arc::new(NukiTransport::new(&config, policy)?);
    let config = Arc::new(config);
    let repository = CodeRepository::new(transport, Arc::clone(&config));

    let lock = repository.target_lock().await?;
    repository.list_codes().await?;

    tracing::info!(lock = %lock.name, smartlock_id = lock.id, "Setup validated");

    Ok(SetupInfo {
        title: format!("Nuki OTP - {}", config.lock_name),
        smartlock_id: lock.id,
        unique_id: unique_id_for(&config.lock_name),
    })
}

fn unique_id_for(lock_name: &str) -> String {
    format!("nuki_otp_{}", lock_name.to_lowercase().replace(' ', "_"))
}
