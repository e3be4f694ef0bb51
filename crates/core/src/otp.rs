//! One-time keypad code generation and validity arithmetic.
//!
//! The generated code is a human-typable PIN, not a security-grade secret.

use rand::Rng;

use crate::models::AuthCode;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Number of digits in a generated code.
pub const CODE_LENGTH: usize = 6;

/// Weekday bitmask covering Monday through Sunday.
pub const ALL_WEEK_DAYS: u8 = 127;

/// Date format the lock cloud expects in request bodies.
pub const API_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

// ---------------------------------------------------------------------------
// Code generation
// ---------------------------------------------------------------------------

/// Generate a random six-digit code using the digits 1-9 only.
///
/// Zero is excluded so the code never has a leading zero and can round-trip
/// through the API's integer field.
pub fn generate_code() -> u32 {
    let mut rng = rand::rng();
    (0..CODE_LENGTH).fold(0u32, |acc, _| acc * 10 + rng.random_range(1..=9u32))
}

// ---------------------------------------------------------------------------
// Validity window
// ---------------------------------------------------------------------------

/// Start and end of a code's validity, both UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl ValidityWindow {
    /// Window opening at `start` and lasting `lifetime_hours`.
    pub fn starting_at(start: Timestamp, lifetime_hours: u32) -> Self {
        Self {
            start,
            end: start + chrono::Duration::hours(i64::from(lifetime_hours)),
        }
    }

    pub fn start_param(&self) -> String {
        format_api_date(self.start)
    }

    pub fn end_param(&self) -> String {
        format_api_date(self.end)
    }
}

/// Render a timestamp as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn format_api_date(ts: Timestamp) -> String {
    ts.format(API_DATE_FORMAT).to_string()
}

// ---------------------------------------------------------------------------
// Expiry
// ---------------------------------------------------------------------------

/// Whether `code` has outlived `lifetime_hours` at instant `now`.
///
/// The boundary is inclusive. A code without a parseable creation date
/// counts as expired so it gets cleaned up rather than left granting access.
pub fn is_expired_at(code: &AuthCode, now: Timestamp, lifetime_hours: u32) -> bool {
    match code.created_at() {
        Some(created) => {
            let lifetime_secs = i64::from(lifetime_hours) * 3600;
            (now - created).num_seconds() >= lifetime_secs
        }
        None => true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    fn code_created(created: Option<Timestamp>) -> AuthCode {
        AuthCode {
            id: "a1".into(),
            name: "OTP_code".into(),
            code: Some(111111),
            creation_date: created.map(format_api_date),
            enabled: true,
            remote_allowed: true,
            lock_count: 0,
        }
    }

    #[test]
    fn generated_code_has_six_nonzero_digits() {
        for _ in 0..1000 {
            let rendered = generate_code().to_string();
            assert_eq!(rendered.len(), CODE_LENGTH, "code {rendered} has wrong length");
            assert!(!rendered.contains('0'), "code {rendered} contains a zero");
        }
    }

    #[test]
    fn generated_codes_vary() {
        let first = generate_code();
        // 9^6 possibilities; twenty identical draws would be astronomically unlikely.
        assert!((0..20).any(|_| generate_code() != first));
    }

    #[test]
    fn api_date_has_millisecond_precision_and_z_suffix() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap() + Duration::milliseconds(67);
        assert_eq!(format_api_date(ts), "2024-01-02T03:04:05.067Z");
    }

    #[test]
    fn window_spans_lifetime() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let window = ValidityWindow::starting_at(start, 12);
        assert_eq!(window.end - window.start, Duration::hours(12));
        assert_eq!(window.start_param(), "2024-06-01T08:00:00.000Z");
        assert_eq!(window.end_param(), "2024-06-01T20:00:00.000Z");
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let created = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let code = code_created(Some(created));
        let lifetime = Duration::hours(12);

        assert!(!is_expired_at(&code, created + lifetime - Duration::seconds(1), 12));
        assert!(is_expired_at(&code, created + lifetime, 12));
        assert!(is_expired_at(&code, created + lifetime + Duration::seconds(1), 12));
    }

    #[test]
    fn fresh_code_is_not_expired_for_any_lifetime() {
        let now = Utc::now();
        let code = code_created(Some(now));
        for hours in [1, 12, 168] {
            assert!(!is_expired_at(&code, now, hours));
        }
    }

    #[test]
    fn missing_creation_date_counts_as_expired() {
        let code = code_created(None);
        assert!(is_expired_at(&code, Utc::now(), 168));
    }
}
