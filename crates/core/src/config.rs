//! Connection and target parameters for one integration instance.
//!
//! An [`OtpConfig`] is built once at setup and then shared immutably
//! (usually behind an `Arc`) by every component of the service.

use std::fmt;

use validator::Validate;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Base URL of the Nuki Web API.
pub const DEFAULT_API_URL: &str = "https://api.nuki.io";

/// Name prefix that marks an authorization as one of ours.
pub const DEFAULT_CODE_PREFIX: &str = "OTP";

/// Default validity of a generated code, in hours.
pub const DEFAULT_LIFETIME_HOURS: u32 = 12;

/// Longest accepted code lifetime (one week).
pub const MAX_LIFETIME_HOURS: u32 = 168;

// ---------------------------------------------------------------------------
// Environment variable names
// ---------------------------------------------------------------------------

pub const ENV_API_URL: &str = "NUKI_API_URL";
pub const ENV_API_TOKEN: &str = "NUKI_API_TOKEN";
pub const ENV_LOCK_NAME: &str = "NUKI_LOCK_NAME";
pub const ENV_CODE_PREFIX: &str = "NUKI_OTP_PREFIX";
pub const ENV_LIFETIME_HOURS: &str = "NUKI_OTP_LIFETIME_HOURS";

// ---------------------------------------------------------------------------
// OtpConfig
// ---------------------------------------------------------------------------

/// Configuration of a single lock integration.
#[derive(Clone, PartialEq, Eq, Validate)]
pub struct OtpConfig {
    /// Base URL of the lock cloud API, without trailing path.
    #[validate(url)]
    pub api_url: String,
    /// Bearer token sent with every request.
    #[validate(length(min = 1))]
    pub api_token: String,
    /// Human-readable name of the smartlock to operate on.
    #[validate(length(min = 1))]
    pub lock_name: String,
    /// Prefix applied to (and used to recognise) generated authorizations.
    #[validate(length(min = 1))]
    pub code_prefix: String,
    /// Validity of a generated code, in hours.
    #[validate(range(min = 1, max = 168))]
    pub lifetime_hours: u32,
}

impl OtpConfig {
    /// Create a configuration with the default URL, prefix and lifetime.
    pub fn new(api_token: impl Into<String>, lock_name: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: api_token.into(),
            lock_name: lock_name.into(),
            code_prefix: DEFAULT_CODE_PREFIX.to_string(),
            lifetime_hours: DEFAULT_LIFETIME_HOURS,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_code_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.code_prefix = prefix.into();
        self
    }

    pub fn with_lifetime_hours(mut self, hours: u32) -> Self {
        self.lifetime_hours = hours;
        self
    }

    /// Run the field validators, mapping failures to [`CoreError::Validation`].
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate()?;
        Ok(())
    }

    /// Name given to authorizations created by this instance.
    pub fn code_name(&self) -> String {
        format!("{}_code", self.code_prefix)
    }

    /// Lifetime as a [`chrono::Duration`].
    pub fn lifetime(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.lifetime_hours))
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var                   | Default               |
    /// |---------------------------|-----------------------|
    /// | `NUKI_API_URL`            | `https://api.nuki.io` |
    /// | `NUKI_API_TOKEN`          | required              |
    /// | `NUKI_LOCK_NAME`          | required              |
    /// | `NUKI_OTP_PREFIX`         | `OTP`                 |
    /// | `NUKI_OTP_LIFETIME_HOURS` | `12`                  |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup and validate it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_token = lookup(ENV_API_TOKEN).ok_or(CoreError::MissingEnv(ENV_API_TOKEN))?;
        let lock_name = lookup(ENV_LOCK_NAME).ok_or(CoreError::MissingEnv(ENV_LOCK_NAME))?;

        let lifetime_hours = match lookup(ENV_LIFETIME_HOURS) {
            Some(raw) => raw.trim().parse().map_err(|_| CoreError::InvalidEnv {
                name: ENV_LIFETIME_HOURS,
                value: raw.clone(),
            })?,
            None => DEFAULT_LIFETIME_HOURS,
        };

        let config = Self {
            api_url: lookup(ENV_API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_token,
            lock_name,
            code_prefix: lookup(ENV_CODE_PREFIX).unwrap_or_else(|| DEFAULT_CODE_PREFIX.to_string()),
            lifetime_hours,
        };

        config.check()?;
        Ok(config)
    }
}

// The token must never end up in logs.
impl fmt::Debug for OtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtpConfig")
            .field("api_url", &self.api_url)
            .field("api_token", &"<redacted>")
            .field("lock_name", &self.lock_name)
            .field("code_prefix", &self.code_prefix)
            .field("lifetime_hours", &self.lifetime_hours)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn new_uses_defaults() {
        let config = OtpConfig::new("token", "Front Door");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.code_prefix, "OTP");
        assert_eq!(config.lifetime_hours, 12);
        assert!(config.check().is_ok());
    }

    #[test]
    fn code_name_appends_suffix_to_prefix() {
        let config = OtpConfig::new("t", "Door").with_code_prefix("GUEST");
        assert_eq!(config.code_name(), "GUEST_code");
    }

    #[test]
    fn lifetime_bounds_are_enforced() {
        let zero = OtpConfig::new("t", "Door").with_lifetime_hours(0);
        assert_matches!(zero.check(), Err(CoreError::Validation(_)));

        let too_long = OtpConfig::new("t", "Door").with_lifetime_hours(MAX_LIFETIME_HOURS + 1);
        assert_matches!(too_long.check(), Err(CoreError::Validation(_)));

        let week = OtpConfig::new("t", "Door").with_lifetime_hours(MAX_LIFETIME_HOURS);
        assert!(week.check().is_ok());
    }

    #[test]
    fn empty_token_and_bad_url_are_rejected() {
        assert_matches!(
            OtpConfig::new("", "Door").check(),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            OtpConfig::new("t", "Door").with_api_url("not a url").check(),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn debug_redacts_token() {
        let rendered = format!("{:?}", OtpConfig::new("super-secret", "Door"));
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn from_lookup_applies_defaults() {
        let config = OtpConfig::from_lookup(lookup_from(&[
            (ENV_API_TOKEN, "tok"),
            (ENV_LOCK_NAME, "Front Door"),
        ]))
        .unwrap();
        assert_eq!(config, OtpConfig::new("tok", "Front Door"));
    }

    #[test]
    fn from_lookup_reads_all_fields() {
        let config = OtpConfig::from_lookup(lookup_from(&[
            (ENV_API_URL, "http://localhost:8080"),
            (ENV_API_TOKEN, "tok"),
            (ENV_LOCK_NAME, "Back Door"),
            (ENV_CODE_PREFIX, "GUEST"),
            (ENV_LIFETIME_HOURS, "48"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "http://localhost:8080");
        assert_eq!(config.lock_name, "Back Door");
        assert_eq!(config.code_prefix, "GUEST");
        assert_eq!(config.lifetime_hours, 48);
    }

    #[test]
    fn from_lookup_requires_token_and_lock() {
        assert_matches!(
            OtpConfig::from_lookup(lookup_from(&[(ENV_LOCK_NAME, "Door")])),
            Err(CoreError::MissingEnv(ENV_API_TOKEN))
        );
        assert_matches!(
            OtpConfig::from_lookup(lookup_from(&[(ENV_API_TOKEN, "tok")])),
            Err(CoreError::MissingEnv(ENV_LOCK_NAME))
        );
    }

    #[test]
    fn from_lookup_rejects_unparseable_lifetime() {
        let result = OtpConfig::from_lookup(lookup_from(&[
            (ENV_API_TOKEN, "tok"),
            (ENV_LOCK_NAME, "Door"),
            (ENV_LIFETIME_HOURS, "twelve"),
        ]));
        assert_matches!(result, Err(CoreError::InvalidEnv { name: ENV_LIFETIME_HOURS, .. }));
    }
}
