use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use lectern_config::EngineConfig;
use lectern_learning::{
    Account, AccountId, AccountStore, LearnerService, LearningError, LoginAttempt, ManualClock,
    MemoryAccountStore, ModuleStatus, NewAccount, PlanTier, Role,
};

struct TestContext {
    service: Arc<LearnerService<MemoryAccountStore>>,
    clock: Arc<ManualClock>,
}

impl TestContext {
    fn new() -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap(),
        ));
        let service = Arc::new(LearnerService::new(
            MemoryAccountStore::new(),
            &EngineConfig::default(),
            clock.clone(),
        ));
        Self { service, clock }
    }

    async fn learner(&self, email: &str) -> Account {
        self.service
            .register(
                NewAccount {
                    name: "Flow Learner".to_string(),
                    email: email.to_string(),
                    role: Role::Learner,
                },
                "$argon2id$placeholder".to_string(),
            )
            .await
            .unwrap()
    }

    async fn wrong_password(&self, account_id: AccountId) -> LoginAttempt {
        self.service
            .attempt_login(account_id, |_| Ok::<_, LearningError>(false))
            .await
            .unwrap()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_completions_record_exactly_once() {
    let ctx = TestContext::new();
    let account_id = ctx.learner("race@example.com").await.id;

    let mut handles = Vec::new();
    for score in [75, 80, 85, 90, 95, 100, 60, 70] {
        let service = ctx.service.clone();
        handles.push(tokio::spawn(async move {
            service.record_module_completion(account_id, 5, score).await
        }));
    }

    let mut recorded = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().is_new() {
            recorded += 1;
        }
    }
    assert_eq!(recorded, 1);

    let stored = ctx.service.get_account(account_id).await.unwrap();
    let for_module: Vec<_> = stored
        .completions
        .iter()
        .filter(|completion| completion.module_id == 5)
        .collect();
    assert_eq!(for_module.len(), 1);
    assert_eq!(stored.progress.current_module, 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_lesson_completions_are_not_lost() {
    let ctx = TestContext::new();
    let account_id = ctx.learner("lessons@example.com").await.id;

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let service = ctx.service.clone();
            tokio::spawn(async move { service.record_lesson_completion(account_id).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = ctx.service.get_account(account_id).await.unwrap();
    assert_eq!(stored.progress.completed_lessons, 20);
}

#[tokio::test]
async fn learner_walks_through_the_course() {
    let ctx = TestContext::new();
    let account = ctx.learner("walk@example.com").await;

    ctx.service
        .activate_subscription(account.id, PlanTier::Basic, None, true)
        .await
        .unwrap();

    for module_id in 1..=3 {
        let stored = ctx.service.get_account(account.id).await.unwrap();
        ctx.service.check_module_access(&stored, module_id).unwrap();
        ctx.service
            .record_module_completion(account.id, module_id, 80)
            .await
            .unwrap();
    }
    for _ in 0..7 {
        ctx.service.record_lesson_completion(account.id).await.unwrap();
    }
    ctx.service.record_time_spent(account.id, 95).await.unwrap();

    let summary = ctx.service.dashboard(account.id).await.unwrap();
    assert_eq!(summary.progress_percentage, 20);
    assert_eq!(summary.current_module, 4);
    assert_eq!(summary.completed_modules, 3);
    assert_eq!(summary.time_spent_minutes, 95);
    assert_eq!(summary.certificates, 3);
    assert_eq!(summary.unread_notifications, 3);
    assert!(summary.entitled);
    assert_eq!(summary.subscription_days_left, 30);
    assert_eq!(summary.modules[3].status, ModuleStatus::InProgress);
    assert_eq!(summary.modules[4].status, ModuleStatus::Locked);

    ctx.clock.advance(Duration::days(31));
    let stored = ctx.service.get_account(account.id).await.unwrap();
    assert_eq!(
        ctx.service.check_module_access(&stored, 2),
        Err(LearningError::NotEntitled)
    );
    assert!(stored.subscription.active, "flag is stale until a sweep or write");

    ctx.service.sweep_subscriptions().await.unwrap();
    let stored = ctx.service.store().find_by_id(account.id).await.unwrap().unwrap();
    assert!(!stored.subscription.active);
}

#[tokio::test]
async fn lock_expiry_resets_counter_on_next_failure() {
    let ctx = TestContext::new();
    let account = ctx.learner("expiry@example.com").await;

    let mut lock_until = None;
    for _ in 0..5 {
        if let LoginAttempt::Rejected { locked_until } = ctx.wrong_password(account.id).await {
            lock_until = locked_until;
        }
    }
    let lock_until = lock_until.unwrap();

    ctx.clock.set(lock_until + Duration::seconds(1));
    let stored = ctx.service.get_account(account.id).await.unwrap();
    assert!(ctx.service.ensure_can_authenticate(&stored).is_ok());

    ctx.wrong_password(account.id).await;
    let stored = ctx.service.get_account(account.id).await.unwrap();
    assert_eq!(stored.security.failed_attempts, 1);
    assert!(stored.security.lock_until.is_none());
}
