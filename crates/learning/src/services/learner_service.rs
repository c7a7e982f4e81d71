//! Store-backed facade over the engine components.
//!
//! Every mutation runs under a per-account async mutex across
//! load, mutate and save. Share one `LearnerService` per process (behind an
//! `Arc`); two instances over the same store do not coordinate.
//!
//! A mutex lives in the map only while some task holds or waits on it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lectern_config::EngineConfig;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::credential_guard::CredentialGuard;
use super::engagement_ledger::EngagementLedger;
use super::progress_aggregator::{DashboardSummary, ProgressAggregator};
use super::progression_ledger::{CompletionOutcome, ProgressionLedger};
use super::subscription_manager::SubscriptionManager;
use crate::entities::{
    Account, Comment, NewAccount, Notification, NotificationType, PlanTier, ProgressCounters,
    Question,
};
use crate::repositories::AccountStore;
use crate::types::{
    AccountId, CommentId, LearningError, LearningResult, ModuleId, NotificationId, QuestionId,
};
use crate::utils::{Clock, SystemClock};

/// Live view of an account's subscription, evaluated at read time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionStatus {
    pub plan: Option<PlanTier>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Entitlement, not the stored flag
    pub active: bool,
    pub auto_renew: bool,
    pub days_remaining: i64,
}

/// How a password attempt was settled under the account's lock.
#[derive(Debug, Clone)]
pub enum LoginAttempt {
    Accepted(Account),
    /// `locked_until` is set when this failure engaged the lock.
    Rejected { locked_until: Option<DateTime<Utc>> },
}

/// Result of one pass of the subscription sweep.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub expired: usize,
    pub warned: usize,
}

pub struct LearnerService<S> {
    store: S,
    clock: Arc<dyn Clock>,
    guard: CredentialGuard,
    subscriptions: SubscriptionManager,
    progression: ProgressionLedger,
    engagement: EngagementLedger,
    aggregator: ProgressAggregator,
    total_lessons: u32,
    locks: Mutex<HashMap<AccountId, Arc<Mutex<()>>>>,
}

impl<S> LearnerService<S>
where
    S: AccountStore,
{
    pub fn new(store: S, config: &EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            guard: CredentialGuard::new(&config.lockout),
            subscriptions: SubscriptionManager::new(&config.subscription),
            progression: ProgressionLedger::new(&config.progression),
            engagement: EngagementLedger::new(&config.engagement),
            aggregator: ProgressAggregator::new(config.progression.total_modules),
            total_lessons: config.progression.total_lessons,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_system_clock(store: S, config: &EngineConfig) -> Self {
        Self::new(store, config, Arc::new(SystemClock))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn credential_guard(&self) -> &CredentialGuard {
        &self.guard
    }

    pub fn progression(&self) -> &ProgressionLedger {
        &self.progression
    }

    async fn account_lock(&self, account_id: AccountId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(account_id).or_default().clone()
    }

    async fn release_account_lock(&self, account_id: AccountId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // the map's reference plus ours: nobody else is queued
        let idle = Arc::strong_count(&lock) == 2
            && locks.get(&account_id).is_some_and(|held| Arc::ptr_eq(held, &lock));
        if idle {
            locks.remove(&account_id);
        }
    }

    /// Load, apply `change`, save. Nothing is written when `change` fails.
    async fn mutate<T, F>(&self, account_id: AccountId, change: F) -> LearningResult<(Account, T)>
    where
        F: FnOnce(&mut Account, DateTime<Utc>) -> LearningResult<T> + Send,
        T: Send,
    {
        let lock = self.account_lock(account_id).await;
        let result = {
            let _held = lock.lock().await;
            self.apply(account_id, change).await
        };
        self.release_account_lock(account_id, lock).await;
        result
    }

    async fn apply<T, F>(&self, account_id: AccountId, change: F) -> LearningResult<(Account, T)>
    where
        F: FnOnce(&mut Account, DateTime<Utc>) -> LearningResult<T> + Send,
        T: Send,
    {
        let mut account = self.get_account(account_id).await?;
        let now = self.clock.now();
        let value = change(&mut account, now)?;
        account.updated_at = now;
        self.store.save(&account).await?;

        Ok((account, value))
    }

    // Accounts

    pub async fn register(&self, request: NewAccount, password_hash: String) -> LearningResult<Account> {
        let now = self.clock.now();
        let account = Account::new(request, password_hash, self.total_lessons, now)?;

        if self.store.find_by_email(&account.email).await?.is_some() {
            return Err(LearningError::EmailAlreadyExists);
        }

        let account = self.store.create(account).await?;
        info!(account_id = account.id, role = %account.role, "account registered");
        Ok(account)
    }

    pub async fn get_account(&self, account_id: AccountId) -> LearningResult<Account> {
        self.store
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| LearningError::not_found(format!("Account {account_id}")))
    }

    pub async fn find_by_email(&self, email: &str) -> LearningResult<Option<Account>> {
        self.store.find_by_email(email).await
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> LearningResult<Option<Account>> {
        self.store.find_by_public_id(public_id).await
    }

    pub async fn deactivate_account(&self, account_id: AccountId) -> LearningResult<Account> {
        let (account, _) = self
            .mutate(account_id, |account, _| {
                account.deactivate();
                Ok(())
            })
            .await?;
        info!(account_id, "account deactivated");
        Ok(account)
    }

    // Credentials

    /// Fails with `AccountLocked` while a lock is active. Call before checking a password.
    pub fn ensure_can_authenticate(&self, account: &Account) -> LearningResult<()> {
        self.guard.ensure_unlocked(account, self.clock.now())
    }

    /// Check the lock, run `verify` and record its verdict, all under the
    /// account's mutex. Concurrent attempts queue, so no more guesses are
    /// evaluated than the lockout allows and a lock set by one attempt is
    /// seen by the next.
    pub async fn attempt_login<F, E>(&self, account_id: AccountId, verify: F) -> Result<LoginAttempt, E>
    where
        F: FnOnce(&Account) -> Result<bool, E> + Send,
        E: From<LearningError>,
    {
        let lock = self.account_lock(account_id).await;
        let result = {
            let _held = lock.lock().await;
            self.settle_login(account_id, verify).await
        };
        self.release_account_lock(account_id, lock).await;
        result
    }

    async fn settle_login<F, E>(&self, account_id: AccountId, verify: F) -> Result<LoginAttempt, E>
    where
        F: FnOnce(&Account) -> Result<bool, E> + Send,
        E: From<LearningError>,
    {
        let mut account = self.get_account(account_id).await?;
        self.guard.ensure_unlocked(&account, self.clock.now())?;

        let verified = verify(&account)?;
        let now = self.clock.now();
        let locked_until = if verified {
            self.guard.record_success(&mut account);
            account.touch(now);
            None
        } else {
            Some(self.guard.record_failure(&mut account, now))
        };
        account.updated_at = now;
        self.store.save(&account).await?;

        Ok(match locked_until {
            None => LoginAttempt::Accepted(account),
            Some(locked_until) => LoginAttempt::Rejected { locked_until },
        })
    }

    // Subscriptions

    /// Payment confirmed. A missing duration falls back to the plan's default.
    pub async fn activate_subscription(
        &self,
        account_id: AccountId,
        plan: PlanTier,
        duration_days: Option<i64>,
        auto_renew: bool,
    ) -> LearningResult<SubscriptionStatus> {
        let subscriptions = &self.subscriptions;
        let days = duration_days.unwrap_or_else(|| plan.default_duration_days());
        let (account, _) = self
            .mutate(account_id, |account, now| {
                subscriptions.activate(account, plan, days, auto_renew, now)
            })
            .await?;
        Ok(self.status_of(&account))
    }

    pub async fn expire_subscription(&self, account_id: AccountId) -> LearningResult<SubscriptionStatus> {
        let subscriptions = &self.subscriptions;
        let (account, _) = self
            .mutate(account_id, |account, _| {
                subscriptions.expire(account);
                Ok(())
            })
            .await?;
        info!(account_id, "subscription expired");
        Ok(self.status_of(&account))
    }

    pub async fn subscription_status(&self, account_id: AccountId) -> LearningResult<SubscriptionStatus> {
        let account = self.get_account(account_id).await?;
        Ok(self.status_of(&account))
    }

    fn status_of(&self, account: &Account) -> SubscriptionStatus {
        let at = self.clock.now();
        let subscription = &account.subscription;
        SubscriptionStatus {
            plan: subscription.plan,
            start_date: subscription.start_date,
            end_date: subscription.end_date,
            active: self.subscriptions.is_entitled(account, at),
            auto_renew: subscription.auto_renew,
            days_remaining: self.subscriptions.days_remaining(account, at),
        }
    }

    pub async fn find_expiring_subscriptions(&self, days: i64) -> LearningResult<Vec<Account>> {
        let accounts = self.store.list_subscribed().await?;
        let at = self.clock.now();
        Ok(self
            .subscriptions
            .find_expiring_within(&accounts, days, at)
            .into_iter()
            .cloned()
            .collect())
    }

    pub async fn find_active_subscriptions(&self) -> LearningResult<Vec<Account>> {
        let accounts = self.store.list_subscribed().await?;
        let at = self.clock.now();
        Ok(self
            .subscriptions
            .find_active(&accounts, at)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Clear lapsed flags and append one expiry warning per entitlement window.
    pub async fn sweep_subscriptions(&self) -> LearningResult<SweepReport> {
        let candidates = self.store.list_subscribed().await?;
        let mut report = SweepReport {
            scanned: candidates.len(),
            ..SweepReport::default()
        };
        let warning_days = self.subscriptions.expiry_warning_days();

        for candidate in candidates {
            let subscriptions = &self.subscriptions;
            let engagement = &self.engagement;
            let result = self
                .mutate(candidate.id, |account, now| {
                    if subscriptions.sweep_expired(account, now) {
                        return Ok(SweepAction::Expired);
                    }

                    let expiring = !subscriptions
                        .find_expiring_within([&*account], warning_days, now)
                        .is_empty();
                    if expiring && !account.subscription.expiry_notified {
                        let days_left = subscriptions.days_remaining(account, now);
                        engagement.push_notification(
                            account,
                            NotificationType::SubscriptionExpiring,
                            "Subscription ending soon",
                            &format!("Your subscription ends in {days_left} day(s)."),
                            json!({ "days_left": days_left }),
                            now,
                        )?;
                        account.subscription.expiry_notified = true;
                        return Ok(SweepAction::Warned);
                    }

                    Ok(SweepAction::Untouched)
                })
                .await;

            match result {
                Ok((_, SweepAction::Expired)) => report.expired += 1,
                Ok((_, SweepAction::Warned)) => report.warned += 1,
                Ok((_, SweepAction::Untouched)) => {}
                Err(err) => {
                    warn!(account_id = candidate.id, error = %err, "subscription sweep skipped account");
                }
            }
        }

        info!(
            scanned = report.scanned,
            expired = report.expired,
            warned = report.warned,
            "subscription sweep finished"
        );
        Ok(report)
    }

    // Progression

    pub async fn record_lesson_completion(&self, account_id: AccountId) -> LearningResult<ProgressCounters> {
        let progression = &self.progression;
        let (account, _) = self
            .mutate(account_id, |account, now| {
                progression.record_lesson_completion(account, now);
                Ok(())
            })
            .await?;
        Ok(account.progress)
    }

    /// Record a graded module. A first passing score also unlocks the next
    /// module and leaves a `lesson_available` notification.
    pub async fn record_module_completion(
        &self,
        account_id: AccountId,
        module_id: ModuleId,
        score: i64,
    ) -> LearningResult<CompletionOutcome> {
        let progression = &self.progression;
        let engagement = &self.engagement;
        let total_modules = self.aggregator.total_modules();

        let (_, outcome) = self
            .mutate(account_id, |account, now| {
                let outcome = progression.record_module_completion(account, module_id, score, now)?;

                let next = module_id.checked_add(1).filter(|next| *next <= total_modules);
                if let (Some(next), CompletionOutcome::Recorded { passed: true, .. }) =
                    (next, &outcome)
                {
                    engagement.push_notification(
                        account,
                        NotificationType::LessonAvailable,
                        &format!("Module {next} unlocked"),
                        &format!("You passed module {module_id}. Module {next} is now available."),
                        json!({ "module_id": next }),
                        now,
                    )?;
                }
                Ok(outcome)
            })
            .await?;
        Ok(outcome)
    }

    pub async fn record_time_spent(&self, account_id: AccountId, minutes: u64) -> LearningResult<ProgressCounters> {
        let progression = &self.progression;
        let (account, _) = self
            .mutate(account_id, |account, now| {
                progression.record_time_spent(account, minutes, now)
            })
            .await?;
        Ok(account.progress)
    }

    pub async fn can_access_module(&self, account_id: AccountId, module_id: ModuleId) -> LearningResult<bool> {
        if module_id == 0 {
            return Err(LearningError::invalid("module ids start at 1"));
        }
        let account = self.get_account(account_id).await?;
        Ok(self.progression.can_access_module(&account, module_id))
    }

    /// Gating plus entitlement, as a content request needs it.
    pub fn check_module_access(&self, account: &Account, module_id: ModuleId) -> LearningResult<()> {
        if module_id == 0 {
            return Err(LearningError::invalid("module ids start at 1"));
        }
        if account.role.bypasses_gating() {
            return Ok(());
        }
        if !self.subscriptions.is_entitled(account, self.clock.now()) {
            return Err(LearningError::NotEntitled);
        }
        if !self.progression.can_access_module(account, module_id) {
            debug!(account_id = account.id, module_id, "module request refused by gating");
            return Err(LearningError::ModuleLocked { module_id });
        }
        Ok(())
    }

    pub async fn dashboard(&self, account_id: AccountId) -> LearningResult<DashboardSummary> {
        let account = self.get_account(account_id).await?;
        Ok(self
            .aggregator
            .summarize(&self.progression, &account, self.clock.now()))
    }

    // Engagement

    pub async fn ask_question(
        &self,
        account_id: AccountId,
        module_id: ModuleId,
        lesson_ref: Option<String>,
        text: &str,
    ) -> LearningResult<Question> {
        let engagement = &self.engagement;
        let (_, question) = self
            .mutate(account_id, |account, now| {
                engagement.ask_question(account, module_id, lesson_ref, text, now)
            })
            .await?;
        Ok(question)
    }

    /// Answer a learner's question and notify the learner.
    pub async fn answer_question(
        &self,
        account_id: AccountId,
        question_id: QuestionId,
        answer: &str,
        actor: AccountId,
    ) -> LearningResult<Question> {
        let engagement = &self.engagement;
        let (_, question) = self
            .mutate(account_id, |account, now| {
                let question = engagement.answer_question(account, question_id, answer, actor, now)?;
                engagement.push_notification(
                    account,
                    NotificationType::QuestionAnswered,
                    "Your question was answered",
                    &format!("A curator answered your question about module {}.", question.module_id),
                    json!({ "question_id": question.id, "module_id": question.module_id }),
                    now,
                )?;
                Ok(question)
            })
            .await?;
        Ok(question)
    }

    pub async fn close_question(&self, account_id: AccountId, question_id: QuestionId) -> LearningResult<Question> {
        let engagement = &self.engagement;
        let (_, question) = self
            .mutate(account_id, |account, _| {
                engagement.close_question(account, question_id)
            })
            .await?;
        Ok(question)
    }

    pub async fn add_comment(&self, account_id: AccountId, lesson_ref: &str, text: &str) -> LearningResult<Comment> {
        let engagement = &self.engagement;
        let (_, comment) = self
            .mutate(account_id, |account, now| {
                engagement.add_comment(account, lesson_ref, text, now)
            })
            .await?;
        Ok(comment)
    }

    pub async fn edit_comment(
        &self,
        account_id: AccountId,
        comment_id: CommentId,
        text: &str,
    ) -> LearningResult<Comment> {
        let engagement = &self.engagement;
        let (_, comment) = self
            .mutate(account_id, |account, now| {
                engagement.edit_comment(account, comment_id, text, now)
            })
            .await?;
        Ok(comment)
    }

    pub async fn push_notification(
        &self,
        account_id: AccountId,
        notification_type: NotificationType,
        title: &str,
        message: &str,
        data: Value,
    ) -> LearningResult<Notification> {
        let engagement = &self.engagement;
        let (_, notification) = self
            .mutate(account_id, |account, now| {
                engagement.push_notification(account, notification_type, title, message, data, now)
            })
            .await?;
        Ok(notification)
    }

    /// Newest first.
    pub async fn list_notifications(&self, account_id: AccountId, unread_only: bool) -> LearningResult<Vec<Notification>> {
        let account = self.get_account(account_id).await?;
        Ok(account
            .engagement
            .notifications
            .into_iter()
            .rev()
            .filter(|notification| !unread_only || !notification.is_read)
            .collect())
    }

    pub async fn mark_notification_read(
        &self,
        account_id: AccountId,
        notification_id: NotificationId,
    ) -> LearningResult<Notification> {
        let engagement = &self.engagement;
        let (_, notification) = self
            .mutate(account_id, |account, _| {
                engagement.mark_notification_read(account, notification_id)
            })
            .await?;
        Ok(notification)
    }

    pub async fn mark_all_notifications_read(&self, account_id: AccountId) -> LearningResult<usize> {
        let engagement = &self.engagement;
        let (_, changed) = self
            .mutate(account_id, |account, _| {
                Ok(engagement.mark_all_notifications_read(account))
            })
            .await?;
        Ok(changed)
    }

    pub async fn unread_count(&self, account_id: AccountId) -> LearningResult<usize> {
        let account = self.get_account(account_id).await?;
        Ok(self.engagement.unread_count(&account))
    }
}

enum SweepAction {
    Expired,
    Warned,
    Untouched,
}
