//! On/off toggle semantics over code creation and deletion.
//!
//! The toggle keeps no state of its own: it is on exactly when at least one
//! of our codes exists remotely. Every completed transition is announced on
//! the [`EventBus`] so dependent readouts can refresh.

use std::sync::Arc;

use nuki_otp_core::AuthCode;
use nuki_otp_events::{EventBus, StateChange, SwitchState};

use crate::error::NukiResult;
use crate::repository::{CodeRepository, IssuedCode};

/// Lifecycle controller behind the code toggle.
#[derive(Clone)]
pub struct OtpSwitch {
    repository: CodeRepository,
    bus: Arc<EventBus>,
}

impl OtpSwitch {
    pub fn new(repository: CodeRepository, bus: Arc<EventBus>) -> Self {
        Self { repository, bus }
    }

    /// Derived state: whether any of our codes exists.
    pub async fn is_on(&self) -> NukiResult<bool> {
        Ok(!self.repository.list_codes().await?.is_empty())
    }

    /// Replace all existing codes with exactly one fresh code.
    ///
    /// The old codes are deleted before the new one is created. If creation
    /// then fails the toggle is off, which is announced before the error is
    /// returned.
    pub async fn turn_on(&self) -> NukiResult<IssuedCode> {
        let existing = self.list_existing().await?;
        self.delete_existing(&existing).await?;

        match self.repository.create_code().await {
            Ok(issued) => {
                tracing::info!(
                    smartlock_id = issued.smartlock_id,
                    replaced = existing.len(),
                    "Code toggle turned on"
                );
                self.bus.publish(StateChange::new(SwitchState::On));
                Ok(issued)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to create one-time code");
                self.bus.publish(StateChange::new(SwitchState::Off));
                Err(e)
            }
        }
    }

    /// Delete every one of our codes.
    pub async fn turn_off(&self) -> NukiResult<()> {
        let existing = self.list_existing().await?;
        self.delete_existing(&existing).await?;

        tracing::info!(removed = existing.len(), "Code toggle turned off");
        self.bus.publish(StateChange::new(SwitchState::Off));
        Ok(())
    }

    async fn list_existing(&self) -> NukiResult<Vec<AuthCode>> {
        self.repository.list_codes().await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to list one-time codes");
        })
    }

    async fn delete_existing(&self, existing: &[AuthCode]) -> NukiResult<()> {
        self.repository.delete_codes(existing).await.inspect_err(|e| {
            tracing::error!(error = %e, count = existing.len(), "Failed to delete one-time codes");
        })
    }
}
