use async_trait::async_trait;

use crate::types::AccountRecord;

/// Read-only account lookup backed by the persistence layer.
/// Implementations: in-memory (server crate), relational stores (external).
#[async_trait]
pub trait AccountLookup: Send + Sync {
    /// Find the account whose login matches `login` exactly (case-sensitive).
    ///
    /// Returns `Ok(None)` when no such account exists. `Err` is reserved for
    /// failures of the backing store itself.
    async fn find_by_login(&self, login: &str) -> anyhow::Result<Option<AccountRecord>>;
}
