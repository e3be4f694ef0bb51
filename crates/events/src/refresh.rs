//! Readout refresh driven by state-change notifications.
//!
//! The remote lock cloud needs a moment before a freshly created or deleted
//! code shows up in listings, so every notification triggers one refresh
//! right away and a second one after a short settle delay.

use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::bus::StateChange;

/// Delay before the follow-up refresh.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Background listener that refreshes an observer on every state change.
pub struct RefreshListener {
    settle_delay: Duration,
}

impl RefreshListener {
    pub fn new(settle_delay: Duration) -> Self {
        Self { settle_delay }
    }

    /// Run the listener loop.
    ///
    /// Exits when the bus is dropped or `cancel` fires.
    pub async fn run<F, Fut>(
        &self,
        mut receiver: broadcast::Receiver<StateChange>,
        cancel: CancellationToken,
        mut refresh: F,
    ) where
        F: FnMut(StateChange) -> Fut,
        Fut: Future<Output = ()>,
    {
        loop {
            let change = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Refresh listener cancelled");
                    break;
                }
                received = receiver.recv() => match received {
                    Ok(change) => change,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Refresh listener lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, refresh listener shutting down");
                        break;
                    }
                },
            };

            tracing::debug!(state = change.state.as_str(), "State change received");
            refresh(change.clone()).await;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.settle_delay) => {}
            }
            refresh(change).await;
        }
    }
}

impl Default for RefreshListener {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_DELAY)
    }
}
