use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use lectern_auth::{AuthError, Authenticator};
use lectern_config::{AuthConfig, DatabaseConfig, EngineConfig};
use lectern_database::{initialize_database, SqliteAccountRepository, SqliteSessionRepository};
use lectern_learning::{
    Clock, LearnerService, LearningError, ManualClock, MemoryAccountStore, MemorySessionStore,
    NewAccount, Role,
};
use tempfile::TempDir;

type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

fn auth_config() -> AuthConfig {
    AuthConfig {
        session_ttl_seconds: 3_600,
        min_password_length: 6,
    }
}

fn new_account(email: &str) -> NewAccount {
    NewAccount {
        name: "Auth Tester".to_string(),
        email: email.to_string(),
        role: Role::Learner,
    }
}

struct TestContext {
    authenticator: Authenticator<MemoryAccountStore, MemorySessionStore>,
    clock: Arc<ManualClock>,
}

impl TestContext {
    fn new() -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 11, 5, 9, 0, 0).unwrap(),
        ));
        let learners = Arc::new(LearnerService::new(
            MemoryAccountStore::new(),
            &EngineConfig::default(),
            clock.clone(),
        ));
        let authenticator = Authenticator::new(learners, MemorySessionStore::new(), &auth_config());
        Self {
            authenticator,
            clock,
        }
    }
}

#[tokio::test]
async fn test_register_and_login_round_trip() -> TestResult {
    let ctx = TestContext::new();
    let auth = &ctx.authenticator;

    let account = auth
        .register_with_password(new_account("Reader@Example.com"), "hunter22")
        .await?;
    assert_eq!(account.email, "reader@example.com");
    assert!(account.password_hash.starts_with("$argon2"));

    let (logged_in, session) = auth
        .login_with_password("reader@example.com", "hunter22")
        .await?;
    assert_eq!(logged_in.id, account.id);
    assert_eq!(session.expires_at, ctx.clock.now() + Duration::hours(1));

    let (resolved, _) = auth.authenticate_token(&session.token).await?;
    assert_eq!(resolved.id, account.id);

    auth.logout(&session.token).await?;
    assert!(matches!(
        auth.authenticate_token(&session.token).await,
        Err(AuthError::SessionNotFound)
    ));
    Ok(())
}

#[tokio::test]
async fn test_registration_validation() -> TestResult {
    let ctx = TestContext::new();
    let auth = &ctx.authenticator;

    let short = auth
        .register_with_password(new_account("short@example.com"), "12345")
        .await;
    assert!(matches!(
        short,
        Err(AuthError::Learning(LearningError::InvalidInput(_)))
    ));

    auth.register_with_password(new_account("taken@example.com"), "secret1")
        .await?;
    let duplicate = auth
        .register_with_password(new_account("TAKEN@example.com"), "secret2")
        .await;
    assert!(matches!(
        duplicate,
        Err(AuthError::Learning(LearningError::EmailAlreadyExists))
    ));
    Ok(())
}

#[tokio::test]
async fn test_lockout_hides_password_correctness() -> TestResult {
    let ctx = TestContext::new();
    let auth = &ctx.authenticator;
    auth.register_with_password(new_account("guess@example.com"), "right-pass")
        .await?;

    for _ in 0..5 {
        let result = auth.login_with_password("guess@example.com", "wrong").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    let with_wrong = auth
        .login_with_password("guess@example.com", "wrong")
        .await
        .unwrap_err();
    let with_right = auth
        .login_with_password("guess@example.com", "right-pass")
        .await
        .unwrap_err();
    assert!(matches!(with_wrong, AuthError::AccountLocked { .. }));
    assert!(matches!(with_right, AuthError::AccountLocked { .. }));
    assert_eq!(with_right.lock_remaining_minutes(), Some(120));

    ctx.clock.advance(Duration::hours(2) + Duration::seconds(1));
    auth.login_with_password("guess@example.com", "right-pass")
        .await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_guesses_stop_at_the_lockout_limit() -> TestResult {
    let ctx = TestContext::new();
    let auth = Arc::new(ctx.authenticator);
    let account = auth
        .register_with_password(new_account("burst@example.com"), "right-pass")
        .await?;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let auth = auth.clone();
        handles.push(tokio::spawn(async move {
            auth.login_with_password("burst@example.com", "wrong").await
        }));
    }

    let (mut rejected, mut locked) = (0, 0);
    for handle in handles {
        match handle.await? {
            Err(AuthError::InvalidCredentials) => rejected += 1,
            Err(AuthError::AccountLocked { .. }) => locked += 1,
            other => panic!("unexpected login outcome: {other:?}"),
        }
    }
    assert_eq!((rejected, locked), (5, 11));

    let stored = auth.learners().get_account(account.id).await?;
    assert_eq!(stored.security.failed_attempts, 5);

    // a correct password arriving after the burst neither logs in nor unlocks
    assert!(matches!(
        auth.login_with_password("burst@example.com", "right-pass").await,
        Err(AuthError::AccountLocked { .. })
    ));
    let stored = auth.learners().get_account(account.id).await?;
    assert!(stored.security.lock_until.is_some());
    Ok(())
}

#[tokio::test]
async fn test_success_resets_failure_counter() -> TestResult {
    let ctx = TestContext::new();
    let auth = &ctx.authenticator;
    let account = auth
        .register_with_password(new_account("reset@example.com"), "right-pass")
        .await?;

    for _ in 0..4 {
        let _ = auth.login_with_password("reset@example.com", "nope").await;
    }
    auth.login_with_password("reset@example.com", "right-pass")
        .await?;

    let stored = auth.learners().get_account(account.id).await?;
    assert_eq!(stored.security.failed_attempts, 0);

    for _ in 0..4 {
        let _ = auth.login_with_password("reset@example.com", "nope").await;
    }
    auth.login_with_password("reset@example.com", "right-pass")
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_unknown_email_and_disabled_account() -> TestResult {
    let ctx = TestContext::new();
    let auth = &ctx.authenticator;

    assert!(matches!(
        auth.login_with_password("ghost@example.com", "whatever").await,
        Err(AuthError::InvalidCredentials)
    ));

    let account = auth
        .register_with_password(new_account("gone@example.com"), "secret1")
        .await?;
    let (_, session) = auth
        .login_with_password("gone@example.com", "secret1")
        .await?;
    auth.learners().deactivate_account(account.id).await?;

    assert!(matches!(
        auth.login_with_password("gone@example.com", "secret1").await,
        Err(AuthError::AccountDisabled)
    ));
    assert!(matches!(
        auth.authenticate_token(&session.token).await,
        Err(AuthError::AccountDisabled)
    ));
    Ok(())
}

#[tokio::test]
async fn test_expired_session_is_removed() -> TestResult {
    let ctx = TestContext::new();
    let auth = &ctx.authenticator;
    auth.register_with_password(new_account("ttl@example.com"), "secret1")
        .await?;
    let (_, session) = auth.login_with_password("ttl@example.com", "secret1").await?;

    ctx.clock.advance(Duration::hours(1));
    assert!(matches!(
        auth.authenticate_token(&session.token).await,
        Err(AuthError::SessionExpired)
    ));
    assert!(matches!(
        auth.authenticate_token(&session.token).await,
        Err(AuthError::SessionNotFound)
    ));
    Ok(())
}

#[tokio::test]
async fn test_sqlite_backed_login() -> TestResult {
    let temp_dir = TempDir::new()?;
    let pool = initialize_database(&DatabaseConfig {
        url: format!("sqlite://{}", temp_dir.path().join("auth.db").display()),
        max_connections: 2,
    })
    .await?;

    let learners = Arc::new(LearnerService::with_system_clock(
        SqliteAccountRepository::new(pool.clone()),
        &EngineConfig::default(),
    ));
    let auth = Authenticator::new(
        learners,
        SqliteSessionRepository::new(pool),
        &auth_config(),
    );

    let account = auth
        .register_with_password(new_account("sql@example.com"), "stored-pass")
        .await?;
    let (_, session) = auth
        .login_with_password("sql@example.com", "stored-pass")
        .await?;
    let (resolved, _) = auth.authenticate_token(&session.token).await?;
    assert_eq!(resolved.id, account.id);
    assert_eq!(auth.logout_everywhere(account.id).await?, 1);
    Ok(())
}
