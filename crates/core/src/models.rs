//! Read-only projections of remote smartlock state.
//!
//! Nothing here is cached or persisted: every operation re-fetches these
//! from the lock cloud.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{SmartlockId, Timestamp};

/// Authorization type discriminator for keypad access codes.
pub const AUTH_TYPE_KEYPAD_CODE: u8 = 13;

/// A smartlock the account controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    #[serde(rename = "smartlockId")]
    pub id: SmartlockId,
    #[serde(default)]
    pub name: String,
}

/// A keypad authorization entry as returned by `GET /smartlock/auth`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCode {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Numeric keypad code; absent when the API withholds it.
    #[serde(default)]
    pub code: Option<u32>,
    /// Raw creation date as sent by the API (ISO-8601, `...Z`).
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub remote_allowed: bool,
    #[serde(default)]
    pub lock_count: i64,
}

impl AuthCode {
    /// Parsed creation instant, or `None` when missing or malformed.
    pub fn created_at(&self) -> Option<Timestamp> {
        let raw = self.creation_date.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Instant at which the code stops being valid for the given lifetime.
    pub fn expires_at(&self, lifetime_hours: u32) -> Option<Timestamp> {
        self.created_at()
            .map(|created| created + chrono::Duration::hours(i64::from(lifetime_hours)))
    }

    /// Whether the entry carries the given ownership prefix.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.name.starts_with(prefix)
    }
}

/// Accept identifiers sent either as JSON strings or numbers.
fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}
