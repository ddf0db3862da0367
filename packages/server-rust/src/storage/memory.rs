//! In-memory [`AccountLookup`] implementation backed by [`DashMap`].
//!
//! Provides concurrent read access without external locking. Accounts are
//! keyed by login, so lookups are exact and case-sensitive.

use std::path::Path;

use anyhow::Context as _;
use async_trait::async_trait;
use dashmap::DashMap;
use suivi_core::{AccountLookup, AccountRecord};
use tracing::info;

/// In-memory account table keyed by login.
pub struct InMemoryAccountStore {
    accounts: DashMap<String, AccountRecord>,
}

impl InMemoryAccountStore {
    /// Creates a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }

    /// Loads a JSON array of [`AccountRecord`]s.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not a JSON array of
    /// accounts, or contains the same login twice.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading accounts from {}", path.display()))?;
        let records: Vec<AccountRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing accounts from {}", path.display()))?;

        let store = Self::new();
        for record in records {
            let login = record.login.clone();
            if store.insert(record).is_some() {
                anyhow::bail!("duplicate login {login:?} in {}", path.display());
            }
        }
        info!(accounts = store.len(), "account store loaded");
        Ok(store)
    }

    /// Inserts or replaces the account for `record.login`, returning the
    /// previous record if any.
    pub fn insert(&self, record: AccountRecord) -> Option<AccountRecord> {
        self.accounts.insert(record.login.clone(), record)
    }

    pub fn remove(&self, login: &str) -> Option<AccountRecord> {
        self.accounts.remove(login).map(|(_, r)| r)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountLookup for InMemoryAccountStore {
    async fn find_by_login(&self, login: &str) -> anyhow::Result<Option<AccountRecord>> {
        Ok(self.accounts.get(login).map(|r| r.value().clone()))
    }
}
