//! In-memory stores for tests and single-process deployments.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{AccountStore, SessionRecord, SessionStore};
use crate::entities::Account;
use crate::types::{AccountId, LearningError, LearningResult};
use crate::utils::validation::normalize_email;

#[derive(Debug, Default)]
struct AccountTable {
    accounts: HashMap<AccountId, Account>,
    email_index: HashMap<String, AccountId>,
    next_id: AccountId,
}

/// Accounts keyed by id with a lowercase email index. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryAccountStore {
    table: Arc<RwLock<AccountTable>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.accounts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl AccountStore for MemoryAccountStore {
    async fn create(&self, mut account: Account) -> LearningResult<Account> {
        let mut table = self.table.write().await;
        let email = normalize_email(&account.email);
        if table.email_index.contains_key(&email) {
            return Err(LearningError::EmailAlreadyExists);
        }

        table.next_id += 1;
        account.id = table.next_id;
        account.email = email.clone();

        table.email_index.insert(email, account.id);
        table.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_by_id(&self, id: AccountId) -> LearningResult<Option<Account>> {
        Ok(self.table.read().await.accounts.get(&id).cloned())
    }

    async fn find_by_public_id(&self, public_id: &str) -> LearningResult<Option<Account>> {
        let table = self.table.read().await;
        Ok(table
            .accounts
            .values()
            .find(|account| account.public_id == public_id)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> LearningResult<Option<Account>> {
        let table = self.table.read().await;
        Ok(table
            .email_index
            .get(&normalize_email(email))
            .and_then(|id| table.accounts.get(id))
            .cloned())
    }

    async fn save(&self, account: &Account) -> LearningResult<()> {
        let mut table = self.table.write().await;
        match table.accounts.get_mut(&account.id) {
            Some(stored) => {
                let mut updated = account.clone();
                // email is immutable once registered
                updated.email = stored.email.clone();
                *stored = updated;
                Ok(())
            }
            None => Err(LearningError::not_found(format!("Account {}", account.id))),
        }
    }

    async fn list_subscribed(&self) -> LearningResult<Vec<Account>> {
        let table = self.table.read().await;
        let mut accounts: Vec<Account> = table
            .accounts
            .values()
            .filter(|account| account.subscription.active)
            .cloned()
            .collect();
        accounts.sort_by_key(|account| account.id);
        Ok(accounts)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    async fn create(&self, session: SessionRecord) -> LearningResult<()> {
        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session);
        Ok(())
    }

    async fn find(&self, token: &str) -> LearningResult<Option<SessionRecord>> {
        Ok(self.sessions.read().await.get(token).cloned())
    }

    async fn delete(&self, token: &str) -> LearningResult<()> {
        self.sessions.write().await.remove(token);
        Ok(())
    }

    async fn delete_for_account(&self, account_id: AccountId) -> LearningResult<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.account_id != account_id);
        Ok((before - sessions.len()) as u64)
    }
}
