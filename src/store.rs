//! Account datastore abstraction.
//!
//! The sweep talks to the datastore through [`AccountStore`] only. Two
//! implementations ship with the crate:
//!
//! - [`MemoryStore`] keeps accounts in process (tests, dry runs)
//! - `server::database::Database` is backed by SQLite or Postgres via sqlx

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::account::{Account, AccountStatus};
use crate::errors::{SweepError, SweepResult};

/// Read/update operations the sweep needs from the account datastore.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fetch one page of accounts with `status = 'trial'` and an email
    /// address, ordered by id, starting strictly after `after_id`.
    async fn fetch_trial_accounts(
        &self,
        after_id: Option<&str>,
        limit: u32,
    ) -> SweepResult<Vec<Account>>;

    /// Set `status = 'expired'` on a trial account.
    ///
    /// Returns `Ok(false)` if no trial account with that id exists anymore.
    async fn mark_expired(&self, id: &str) -> SweepResult<bool>;
}

/// In-process account store.
///
/// Keeps accounts ordered by id so paging behaves like the SQL store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: Mutex<BTreeMap<String, Account>>,
    expired_ids: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-filled with `accounts`.
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let store = Self::new();
        for account in accounts {
            store.upsert(account);
        }
        store
    }

    /// Insert or replace an account keyed on its id.
    pub fn upsert(&self, account: Account) {
        if let Ok(mut accounts) = self.accounts.lock() {
            accounts.insert(account.id.clone(), account);
        }
    }

    pub fn get(&self, id: &str) -> Option<Account> {
        self.accounts.lock().ok()?.get(id).cloned()
    }

    /// Ids passed to a successful [`AccountStore::mark_expired`], in call order.
    pub fn expired_ids(&self) -> Vec<String> {
        self.expired_ids
            .lock()
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }

    fn lock_accounts(&self) -> SweepResult<MutexGuard<'_, BTreeMap<String, Account>>> {
        self.accounts
            .lock()
            .map_err(|_| SweepError::StoreError("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn fetch_trial_accounts(
        &self,
        after_id: Option<&str>,
        limit: u32,
    ) -> SweepResult<Vec<Account>> {
        let accounts = self.lock_accounts()?;

        let page = accounts
            .values()
            .filter(|a| after_id.map_or(true, |after| a.id.as_str() > after))
            .filter(|a| a.is_trial() && !a.email.is_empty())
            .take(limit as usize)
            .cloned()
            .collect();

        Ok(page)
    }

    async fn mark_expired(&self, id: &str) -> SweepResult<bool> {
        let mut accounts = self.lock_accounts()?;

        match accounts.get_mut(id) {
            Some(account) if account.is_trial() => {
                account.status = AccountStatus::Expired.as_str().to_string();
                drop(accounts);
                if let Ok(mut ids) = self.expired_ids.lock() {
                    ids.push(id.to_string());
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn account(id: &str, status: &str, email: &str) -> Account {
        Account {
            id: id.to_string(),
            name: format!("Pharmacie {id}"),
            contact_name: None,
            email: email.to_string(),
            plan: "Starter".to_string(),
            status: status.to_string(),
            trial_end: Utc::now(),
        }
    }

    #[tokio::test]
    async fn fetch_filters_status_and_email() {
        let store = MemoryStore::with_accounts([
            account("a", "trial", "a@example.sn"),
            account("b", "active", "b@example.sn"),
            account("c", "trial", ""),
            account("d", "expired", "d@example.sn"),
        ]);

        let page = store.fetch_trial_accounts(None, 10).await.unwrap();
        let ids: Vec<_> = page.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[tokio::test]
    async fn fetch_pages_by_id() {
        let store = MemoryStore::with_accounts(
            ["a", "b", "c", "d", "e"].map(|id| account(id, "trial", "x@example.sn")),
        );

        let first = store.fetch_trial_accounts(None, 2).await.unwrap();
        assert_eq!(first.len(), 2);
        let second = store.fetch_trial_accounts(Some("b"), 2).await.unwrap();
        assert_eq!(second[0].id, "c");
        let last = store.fetch_trial_accounts(Some("d"), 2).await.unwrap();
        assert_eq!(last.len(), 1);
    }

    #[tokio::test]
    async fn mark_expired_only_touches_trial_accounts() {
        let store = MemoryStore::with_accounts([
            account("a", "trial", "a@example.sn"),
            account("b", "active", "b@example.sn"),
        ]);

        assert!(store.mark_expired("a").await.unwrap());
        assert!(!store.mark_expired("a").await.unwrap());
        assert!(!store.mark_expired("b").await.unwrap());
        assert!(!store.mark_expired("missing").await.unwrap());

        assert_eq!(store.get("a").unwrap().status, "expired");
        assert_eq!(store.get("b").unwrap().status, "active");
        assert_eq!(store.expired_ids(), vec!["a".to_string()]);
    }
}
