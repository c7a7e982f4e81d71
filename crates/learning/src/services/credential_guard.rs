//! Failed-login tracking and timed lockout.
//!
//! Expiry is lazy: a past-dated lock simply stops counting as locked, and the
//! next recorded failure starts a fresh window.

use chrono::{DateTime, Duration, Utc};
use lectern_config::LockoutConfig;
use tracing::warn;

use crate::entities::Account;
use crate::types::{LearningError, LearningResult};

#[derive(Debug, Clone)]
pub struct CredentialGuard {
    max_attempts: u32,
    window: Duration,
}

impl CredentialGuard {
    pub fn new(config: &LockoutConfig) -> Self {
        Self {
            max_attempts: config.max_failed_attempts.max(1),
            window: Duration::minutes(config.lockout_minutes),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_locked(&self, account: &Account, now: DateTime<Utc>) -> bool {
        matches!(account.security.lock_until, Some(until) if until > now)
    }

    /// Time left on an active lock, `None` when unlocked.
    pub fn lock_remaining(&self, account: &Account, now: DateTime<Utc>) -> Option<Duration> {
        match account.security.lock_until {
            Some(until) if until > now => Some(until - now),
            _ => None,
        }
    }

    /// Fails with [`LearningError::AccountLocked`] while a lock is active.
    pub fn ensure_unlocked(&self, account: &Account, now: DateTime<Utc>) -> LearningResult<()> {
        match self.lock_remaining(account, now) {
            Some(remaining) => {
                // round up so a sub-second remainder still reads as locked
                let millis = remaining.num_milliseconds();
                Err(LearningError::AccountLocked {
                    remaining_seconds: (millis + 999) / 1000,
                })
            }
            None => Ok(()),
        }
    }

    /// Count one failed attempt. Returns the lock expiry if this failure engaged it.
    pub fn record_failure(
        &self,
        account: &mut Account,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let security = &mut account.security;

        match security.lock_until {
            Some(until) if until <= now => {
                security.lock_until = None;
                security.failed_attempts = 1;
            }
            _ => {
                security.failed_attempts = security.failed_attempts.saturating_add(1);
            }
        }

        let already_locked = matches!(security.lock_until, Some(until) if until > now);
        if security.failed_attempts >= self.max_attempts && !already_locked {
            let until = now + self.window;
            security.lock_until = Some(until);
            warn!(
                account_id = account.id,
                attempts = security.failed_attempts,
                locked_until = %until,
                "account locked after repeated failed logins"
            );
            return Some(until);
        }

        None
    }

    pub fn record_success(&self, account: &mut Account) {
        account.security.failed_attempts = 0;
        account.security.lock_until = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{NewAccount, Role};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 14, 8, 0, 0).unwrap()
    }

    fn guard() -> CredentialGuard {
        CredentialGuard::new(&LockoutConfig::default())
    }

    fn account() -> Account {
        Account::new(
            NewAccount {
                name: "Ivan".to_string(),
                email: "ivan@example.com".to_string(),
                role: Role::Learner,
            },
            "hash".to_string(),
            35,
            now(),
        )
        .unwrap()
    }

    #[test]
    fn test_five_failures_lock_for_two_hours() {
        let guard = guard();
        let mut account = account();

        for attempt in 1..=4 {
            assert!(guard.record_failure(&mut account, now()).is_none());
            assert_eq!(account.security.failed_attempts, attempt);
            assert!(!guard.is_locked(&account, now()));
        }

        let locked_until = guard.record_failure(&mut account, now());
        assert_eq!(locked_until, Some(now() + Duration::hours(2)));
        assert_eq!(account.security.failed_attempts, 5);
        assert!(guard.is_locked(&account, now()));
        assert!(guard.is_locked(&account, now() + Duration::minutes(119)));
    }

    #[test]
    fn test_lock_expires_lazily_and_next_failure_resets_counter() {
        let guard = guard();
        let mut account = account();
        for _ in 0..5 {
            guard.record_failure(&mut account, now());
        }
        let expiry = account.security.lock_until.unwrap();

        let later = expiry + Duration::seconds(1);
        assert!(!guard.is_locked(&account, later));
        assert!(!guard.is_locked(&account, expiry));

        assert!(guard.record_failure(&mut account, later).is_none());
        assert_eq!(account.security.failed_attempts, 1);
        assert!(account.security.lock_until.is_none());
    }

    #[test]
    fn test_failure_during_active_lock_does_not_extend_it() {
        let guard = guard();
        let mut account = account();
        for _ in 0..5 {
            guard.record_failure(&mut account, now());
        }
        let expiry = account.security.lock_until;

        let during = now() + Duration::minutes(30);
        assert!(guard.record_failure(&mut account, during).is_none());
        assert_eq!(account.security.lock_until, expiry);
        assert_eq!(account.security.failed_attempts, 6);
    }

    #[test]
    fn test_success_clears_counter_and_lock() {
        let guard = guard();
        let mut account = account();
        for _ in 0..5 {
            guard.record_failure(&mut account, now());
        }

        guard.record_success(&mut account);
        assert_eq!(account.security.failed_attempts, 0);
        assert!(account.security.lock_until.is_none());
        assert!(!guard.is_locked(&account, now()));
    }

    #[test]
    fn test_ensure_unlocked_reports_remaining_seconds() {
        let guard = guard();
        let mut account = account();
        for _ in 0..5 {
            guard.record_failure(&mut account, now());
        }

        let err = guard
            .ensure_unlocked(&account, now() + Duration::minutes(60))
            .unwrap_err();
        assert_eq!(
            err,
            LearningError::AccountLocked {
                remaining_seconds: 3_600
            }
        );
        assert!(guard
            .ensure_unlocked(&account, now() + Duration::hours(2))
            .is_ok());
    }

    #[test]
    fn test_single_attempt_threshold_relocks_after_expiry() {
        let guard = CredentialGuard::new(&LockoutConfig {
            max_failed_attempts: 1,
            lockout_minutes: 10,
        });
        let mut account = account();

        assert!(guard.record_failure(&mut account, now()).is_some());
        let later = now() + Duration::minutes(11);
        assert!(guard.record_failure(&mut account, later).is_some());
        assert_eq!(account.security.failed_attempts, 1);
    }
}
