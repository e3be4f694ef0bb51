//! Host-facing readout of the currently active code.

use serde::Serialize;

use crate::models::AuthCode;

/// Value shown when no code is active.
pub const NO_CODE: &str = "------";

pub const STATUS_ACTIVE: &str = "Active";
pub const STATUS_NO_CODE: &str = "No active code";

/// Value shown for an expiry that cannot be computed.
pub const EXPIRY_UNKNOWN: &str = "Unknown";

/// Metadata published next to the code value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadoutAttributes {
    pub code: String,
    pub name: String,
    pub enabled: bool,
    pub remote_allowed: bool,
    pub lock_count: i64,
    pub creation_date: String,
    pub expiry_date: String,
}

/// Snapshot rendered by a readout observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OtpReadout {
    /// The active code, or [`NO_CODE`].
    pub value: String,
    pub status: &'static str,
    #[serde(flatten)]
    pub attributes: Option<ReadoutAttributes>,
}

impl OtpReadout {
    /// Build the readout from the listed codes; only the first one is shown.
    pub fn from_codes(codes: &[AuthCode], lifetime_hours: u32) -> Self {
        match codes.first() {
            Some(current) => Self::for_code(current, lifetime_hours),
            None => Self::empty(),
        }
    }

    pub fn empty() -> Self {
        Self {
            value: NO_CODE.to_string(),
            status: STATUS_NO_CODE,
            attributes: None,
        }
    }

    fn for_code(current: &AuthCode, lifetime_hours: u32) -> Self {
        let value = current
            .code
            .map(|c| c.to_string())
            .unwrap_or_else(|| NO_CODE.to_string());

        let expiry_date = current
            .expires_at(lifetime_hours)
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_else(|| EXPIRY_UNKNOWN.to_string());

        Self {
            value,
            status: STATUS_ACTIVE,
            attributes: Some(ReadoutAttributes {
                code: current.code.map(|c| c.to_string()).unwrap_or_default(),
                name: current.name.clone(),
                enabled: current.enabled,
                remote_allowed: current.remote_allowed,
                lock_count: current.lock_count,
                creation_date: current.creation_date.clone().unwrap_or_default(),
                expiry_date,
            }),
        }
    }

    pub fn is_active(&self) -> bool {
        self.attributes.is_some()
    }
}
