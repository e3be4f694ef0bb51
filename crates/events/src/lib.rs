//! State-change notification plumbing.
//!
//! - [`EventBus`] -- in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`StateChange`] -- the `{state: "on" | "off"}` notification envelope.
//! - [`RefreshListener`] -- refreshes a readout on every notification, then
//!   again after a settle delay.

pub mod bus;
pub mod refresh;

pub use bus::{EventBus, StateChange, SwitchState};
pub use refresh::RefreshListener;
