//! In-process state-change bus backed by a `tokio::sync::broadcast` channel.
//!
//! The lifecycle controller publishes a [`StateChange`] after every toggle;
//! readouts and other dependent observers subscribe. The bus is designed to
//! be shared via `Arc<EventBus>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// StateChange
// ---------------------------------------------------------------------------

/// Logical state of the code toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchState {
    On,
    Off,
}

impl SwitchState {
    pub fn as_str(self) -> &'static str {
        match self {
            SwitchState::On => "on",
            SwitchState::Off => "off",
        }
    }
}

/// Notification that the toggle reached a new state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateChange {
    pub state: SwitchState,

    /// When the change was observed (UTC).
    pub timestamp: DateTime<Utc>,
}

impl StateChange {
    pub fn new(state: SwitchState) -> Self {
        Self {
            state,
            timestamp: Utc::now(),
        }
    }

    /// Wire payload broadcast to host observers: `{"state": "on" | "off"}`.
    pub fn payload(&self) -> serde_json::Value {
        serde_json::json!({ "state": self.state })
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 64;

/// In-process fan-out bus for [`StateChange`] notifications.
pub struct EventBus {
    sender: broadcast::Sender<StateChange>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed notifications are
    /// dropped and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a notification to all current subscribers.
    ///
    /// Dropped silently when nobody is subscribed.
    pub fn publish(&self, change: StateChange) {
        tracing::debug!(state = change.state.as_str(), "Publishing state change");
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(change);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
