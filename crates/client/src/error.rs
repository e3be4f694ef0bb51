//! Error taxonomy for calls against the lock cloud.

use nuki_otp_core::CoreError;

/// Errors from the lock cloud client layer.
#[derive(Debug, thiserror::Error)]
pub enum NukiError {
    /// The API rejected the bearer token (HTTP 401 or 403).
    #[error("Authentication rejected ({status}): {body}")]
    Authentication {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// Every attempt timed out.
    #[error("Request timed out after {attempts} attempts")]
    Timeout { attempts: u32 },

    /// The request could not be delivered (DNS, connect, TLS, ...).
    #[error("HTTP request failed after {attempts} attempts: {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// No smartlock on the account carries the configured name.
    #[error("Smartlock not found: {name}")]
    LockNotFound { name: String },

    /// Any other non-success status.
    #[error("Nuki API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// A body could not be encoded or did not have the expected shape.
    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] CoreError),
}

impl NukiError {
    pub fn is_authentication(&self) -> bool {
        matches!(self, NukiError::Authentication { .. })
    }

    /// Timeout or transport failure after retries were exhausted.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, NukiError::Timeout { .. } | NukiError::Transport { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, NukiError::LockNotFound { .. })
    }
}

/// Convenience alias for client results.
pub type NukiResult<T> = Result<T, NukiError>;
