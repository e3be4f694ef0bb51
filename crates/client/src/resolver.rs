//! Smartlock lookup by human-readable name.

use std::sync::Arc;

use nuki_otp_core::Lock;

use crate::error::{NukiError, NukiResult};
use crate::transport::NukiTransport;

/// Path listing every smartlock on the account.
pub const SMARTLOCKS_PATH: &str = "smartlock";

/// Resolves a lock name to its identifier.
///
/// Nothing is cached: a rename on the remote side is picked up by the next
/// operation.
#[derive(Clone)]
pub struct LockResolver {
    transport: Arc<NukiTransport>,
}

impl LockResolver {
    pub fn new(transport: Arc<NukiTransport>) -> Self {
        Self { transport }
    }

    /// List every smartlock the account controls.
    pub async fn list_locks(&self) -> NukiResult<Vec<Lock>> {
        self.transport.fetch_all(SMARTLOCKS_PATH).await
    }

    /// Find the first lock whose name equals `name` exactly.
    pub async fn resolve(&self, name: &str) -> NukiResult<Lock> {
        let locks = self.list_locks().await?;
        match find_by_name(locks, name) {
            Some(lock) => {
                tracing::debug!(lock = %lock.name, smartlock_id = lock.id, "Resolved smartlock");
                Ok(lock)
            }
            None => {
                tracing::warn!(lock = name, "Smartlock not found on account");
                Err(NukiError::LockNotFound {
                    name: name.to_string(),
                })
            }
        }
    }
}

/// Exact, case-sensitive match; duplicates resolve to the first entry.
fn find_by_name(locks: Vec<Lock>, name: &str) -> Option<Lock> {
    locks.into_iter().find(|lock| lock.name == name)
}
