//! Periodic readout refresh.
//!
//! [`CodePoller`] runs housekeeping followed by a fresh listing on a fixed
//! interval and publishes the result on a `watch` channel. A failed listing
//! marks the readout unavailable until the next successful pass.

use std::sync::Arc;
use std::time::Duration;

use nuki_otp_client::OtpService;
use nuki_otp_core::OtpReadout;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Default interval between refresh passes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);

/// Latest readout as seen by observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadoutState {
    /// Whether the most recent refresh succeeded.
    pub available: bool,
    /// Last successfully rendered readout.
    pub readout: OtpReadout,
}

impl Default for ReadoutState {
    fn default() -> Self {
        Self {
            available: false,
            readout: OtpReadout::empty(),
        }
    }
}

// ---------------------------------------------------------------------------
// CodePoller
// ---------------------------------------------------------------------------

/// Background refresher for one [`OtpService`].
#[derive(Clone)]
pub struct CodePoller {
    service: OtpService,
    interval: Duration,
    state: Arc<watch::Sender<ReadoutState>>,
}

impl CodePoller {
    pub fn new(service: OtpService, interval: Duration) -> Self {
        let (state, _) = watch::channel(ReadoutState::default());
        Self {
            service,
            interval,
            state: Arc::new(state),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ReadoutState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> ReadoutState {
        self.state.borrow().clone()
    }

    /// Run one refresh pass and publish the outcome.
    ///
    /// On failure the previous readout is kept and only the availability
    /// flag drops.
    pub async fn poll_once(&self) -> ReadoutState {
        match self.service.readout().await {
            Ok(readout) => {
                tracing::info!(
                    status = readout.status,
                    active = readout.is_active(),
                    "Readout refreshed"
                );
                self.state.send_replace(ReadoutState {
                    available: true,
                    readout,
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "Readout refresh failed");
                self.state.send_modify(|state| state.available = false);
            }
        }
        self.current()
    }

    /// Run the refresh loop.
    ///
    /// The first pass runs immediately. The loop exits when `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Code poller cancelled");
                    break;
                }
                _ = interval.tick() => {
                    self.poll_once().await;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
