//! Domain layer for the Nuki one-time-code integration.
//!
//! Holds the configuration, the projections of remote smartlock state,
//! code generation and the pure expiry arithmetic. This crate has no
//! internal deps and performs no I/O, so both the API client and the host
//! agent can share it.

pub mod config;
pub mod error;
pub mod models;
pub mod otp;
pub mod readout;
pub mod types;

pub use config::OtpConfig;
pub use error::CoreError;
pub use models::{AuthCode, Lock};
pub use readout::OtpReadout;
