//! Storage seams for the engine.
//!
//! An account is persisted as one aggregate; `save` replaces it whole so a
//! reader never sees half of a mutation.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::Account;
use crate::types::{AccountId, LearningResult};

pub mod memory;

pub use memory::{MemoryAccountStore, MemorySessionStore};

pub trait AccountStore: Send + Sync {
    /// Persist a new account and assign its id. Fails with
    /// `EmailAlreadyExists` when the lowercased email is taken.
    fn create(&self, account: Account) -> impl Future<Output = LearningResult<Account>> + Send;

    fn find_by_id(
        &self,
        id: AccountId,
    ) -> impl Future<Output = LearningResult<Option<Account>>> + Send;

    fn find_by_public_id(
        &self,
        public_id: &str,
    ) -> impl Future<Output = LearningResult<Option<Account>>> + Send;

    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = LearningResult<Option<Account>>> + Send;

    /// Replace the stored aggregate. Fails with `NotFound` for unknown ids.
    fn save(&self, account: &Account) -> impl Future<Output = LearningResult<()>> + Send;

    /// Accounts whose stored subscription flag is set, stale or not.
    fn list_subscribed(&self) -> impl Future<Output = LearningResult<Vec<Account>>> + Send;
}

/// A bearer session handed out after a successful login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub token: String,
    pub account_id: AccountId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, at: DateTime<Utc>) -> bool {
        self.expires_at <= at
    }
}

pub trait SessionStore: Send + Sync {
    fn create(&self, session: SessionRecord) -> impl Future<Output = LearningResult<()>> + Send;

    fn find(
        &self,
        token: &str,
    ) -> impl Future<Output = LearningResult<Option<SessionRecord>>> + Send;

    fn delete(&self, token: &str) -> impl Future<Output = LearningResult<()>> + Send;

    fn delete_for_account(
        &self,
        account_id: AccountId,
    ) -> impl Future<Output = LearningResult<u64>> + Send;
}
