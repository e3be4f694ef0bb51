//! Nuki Web API client and one-time code lifecycle management.
//!
//! Layers, leaf first:
//!
//! - [`transport`] -- authenticated requests with timeout and bounded retry.
//! - [`resolver`] -- smartlock lookup by name.
//! - [`repository`] -- list, create and delete our keypad codes.
//! - [`evaluator`] -- expiry and usage checks.
//! - [`housekeeper`] -- best-effort removal of expired or used codes.
//! - [`lifecycle`] -- the on/off toggle.
//! - [`setup`] -- configuration validation against the live API.
//! - [`service`] -- the facade a host constructs per configured lock.

pub mod error;
pub mod evaluator;
pub mod housekeeper;
pub mod lifecycle;
pub mod repository;
pub mod resolver;
pub mod service;
pub mod setup;
pub mod transport;

pub use error::{NukiError, NukiResult};
pub use housekeeper::HousekeepingReport;
pub use repository::IssuedCode;
pub use service::{CodeSnapshot, OtpService};
pub use setup::{validate_setup, SetupError, SetupInfo};
pub use transport::RetryPolicy;
