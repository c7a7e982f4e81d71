//! Module completion log and the gating rule built on it.

use chrono::{DateTime, Utc};
use lectern_config::ProgressionConfig;
use tracing::{debug, info};

use crate::entities::{Account, Certificate, ModuleCompletion};
use crate::types::{LearningError, LearningResult, ModuleId};

/// What a module-completion call did to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// A new record was appended.
    Recorded {
        passed: bool,
        certificate: Option<Certificate>,
    },
    /// A record already existed; its score was left untouched.
    AlreadyRecorded { existing_score: u8 },
}

impl CompletionOutcome {
    pub fn is_new(&self) -> bool {
        matches!(self, CompletionOutcome::Recorded { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ProgressionLedger {
    pass_score: u8,
    certificate_base_url: String,
}

impl ProgressionLedger {
    pub fn new(config: &ProgressionConfig) -> Self {
        Self {
            pass_score: config.pass_score.min(100),
            certificate_base_url: config.certificate_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn pass_score(&self) -> u8 {
        self.pass_score
    }

    /// Pure query over the completion log. Never consults `current_module`.
    pub fn can_access_module(&self, account: &Account, module_id: ModuleId) -> bool {
        if account.role.bypasses_gating() {
            return true;
        }

        if module_id <= 1 {
            return true;
        }

        account
            .completion_for(module_id - 1)
            .is_some_and(|completion| completion.score >= self.pass_score)
    }

    pub fn record_lesson_completion(&self, account: &mut Account, now: DateTime<Utc>) {
        let progress = &mut account.progress;
        if progress.completed_lessons < progress.total_lessons {
            progress.completed_lessons += 1;
        } else {
            debug!(
                account_id = account.id,
                total = progress.total_lessons,
                "lesson counter already at course total"
            );
        }
        account.touch(now);
    }

    /// Append a completion unless one exists, then advance `current_module`.
    ///
    /// Retried submissions never overwrite the first recorded score.
    pub fn record_module_completion(
        &self,
        account: &mut Account,
        module_id: ModuleId,
        score: i64,
        now: DateTime<Utc>,
    ) -> LearningResult<CompletionOutcome> {
        if module_id == 0 {
            return Err(LearningError::invalid("module ids start at 1"));
        }

        let score = u8::try_from(score)
            .ok()
            .filter(|score| *score <= 100)
            .ok_or_else(|| {
                LearningError::invalid(format!("score must be within 0..=100, got {score}"))
            })?;

        let outcome = match account.completion_for(module_id) {
            Some(existing) => {
                debug!(
                    account_id = account.id,
                    module_id,
                    existing_score = existing.score,
                    "module completion already recorded"
                );
                CompletionOutcome::AlreadyRecorded {
                    existing_score: existing.score,
                }
            }
            None => {
                account.completions.push(ModuleCompletion {
                    module_id,
                    completed_at: now,
                    score,
                });

                let passed = score >= self.pass_score;
                let certificate = if passed {
                    self.issue_certificate(account, module_id, now)
                } else {
                    None
                };

                info!(account_id = account.id, module_id, score, passed, "module completed");
                CompletionOutcome::Recorded {
                    passed,
                    certificate,
                }
            }
        };

        let next = module_id.saturating_add(1);
        account.progress.current_module = account.progress.current_module.max(next);
        account.touch(now);

        Ok(outcome)
    }

    pub fn record_time_spent(
        &self,
        account: &mut Account,
        minutes: u64,
        now: DateTime<Utc>,
    ) -> LearningResult<()> {
        if minutes == 0 {
            return Err(LearningError::invalid("time spent must be positive"));
        }

        account.progress.time_spent = account.progress.time_spent.saturating_add(minutes);
        account.touch(now);
        Ok(())
    }

    fn issue_certificate(
        &self,
        account: &mut Account,
        module_id: ModuleId,
        now: DateTime<Utc>,
    ) -> Option<Certificate> {
        if account
            .certificates
            .iter()
            .any(|certificate| certificate.module_id == module_id)
        {
            return None;
        }

        let certificate = Certificate {
            module_id,
            issued_at: now,
            certificate_url: format!(
                "{}/{}/module-{}",
                self.certificate_base_url, account.public_id, module_id
            ),
        };
        account.certificates.push(certificate.clone());
        Some(certificate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{NewAccount, Role};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, 15, 0, 0).unwrap()
    }

    fn ledger() -> ProgressionLedger {
        ProgressionLedger::new(&ProgressionConfig::default())
    }

    fn account_with_role(role: Role) -> Account {
        Account::new(
            NewAccount {
                name: "Learner".to_string(),
                email: "learner@example.com".to_string(),
                role,
            },
            "hash".to_string(),
            3,
            now(),
        )
        .unwrap()
    }

    #[test]
    fn test_gating_follows_previous_module_score() {
        let ledger = ledger();

        let fresh = account_with_role(Role::Learner);
        assert!(ledger.can_access_module(&fresh, 1));
        assert!(!ledger.can_access_module(&fresh, 2));

        let mut passed = account_with_role(Role::Learner);
        ledger
            .record_module_completion(&mut passed, 1, 70, now())
            .unwrap();
        assert!(ledger.can_access_module(&passed, 2));
        assert!(!ledger.can_access_module(&passed, 3));

        let mut failed = account_with_role(Role::Learner);
        ledger
            .record_module_completion(&mut failed, 1, 69, now())
            .unwrap();
        assert!(!ledger.can_access_module(&failed, 2));
    }

    #[test]
    fn test_gating_ignores_current_module_counter() {
        let ledger = ledger();
        let mut account = account_with_role(Role::Learner);
        account.progress.current_module = 6;
        assert!(!ledger.can_access_module(&account, 5));
    }

    #[test]
    fn test_curator_and_admin_bypass_gating() {
        let ledger = ledger();
        assert!(ledger.can_access_module(&account_with_role(Role::Curator), 8));
        assert!(ledger.can_access_module(&account_with_role(Role::Admin), 8));
        assert!(!ledger.can_access_module(&account_with_role(Role::Manager), 8));
    }

    #[test]
    fn test_duplicate_completion_is_ledger_noop() {
        let ledger = ledger();
        let mut account = account_with_role(Role::Learner);

        let first = ledger
            .record_module_completion(&mut account, 3, 85, now())
            .unwrap();
        assert!(first.is_new());

        let second = ledger
            .record_module_completion(&mut account, 3, 85, now() + Duration::minutes(1))
            .unwrap();
        assert_eq!(
            second,
            CompletionOutcome::AlreadyRecorded { existing_score: 85 }
        );

        let records: Vec<_> = account
            .completions
            .iter()
            .filter(|c| c.module_id == 3)
            .collect();
        assert_eq!(records.len(), 1);
        assert_eq!(account.progress.current_module, 4);
        assert_eq!(account.certificates.len(), 1);
    }

    #[test]
    fn test_retry_cannot_overwrite_score() {
        let ledger = ledger();
        let mut account = account_with_role(Role::Learner);
        ledger
            .record_module_completion(&mut account, 1, 40, now())
            .unwrap();
        ledger
            .record_module_completion(&mut account, 1, 95, now())
            .unwrap();

        assert_eq!(account.completion_for(1).unwrap().score, 40);
        assert!(!ledger.can_access_module(&account, 2));
        assert!(account.certificates.is_empty());
    }

    #[test]
    fn test_current_module_never_decreases() {
        let ledger = ledger();
        let mut account = account_with_role(Role::Learner);
        ledger
            .record_module_completion(&mut account, 4, 90, now())
            .unwrap();
        ledger
            .record_module_completion(&mut account, 2, 90, now())
            .unwrap();
        assert_eq!(account.progress.current_module, 5);
    }

    #[test]
    fn test_invalid_scores_rejected_without_mutation() {
        let ledger = ledger();
        let mut account = account_with_role(Role::Learner);

        for score in [-1, 101, 1_000] {
            let err = ledger
                .record_module_completion(&mut account, 1, score, now())
                .unwrap_err();
            assert!(matches!(err, LearningError::InvalidInput(_)));
        }
        assert!(ledger
            .record_module_completion(&mut account, 0, 80, now())
            .is_err());

        assert!(account.completions.is_empty());
        assert_eq!(account.progress.current_module, 1);
    }

    #[test]
    fn test_boundary_scores_accepted() {
        let ledger = ledger();
        let mut account = account_with_role(Role::Learner);
        assert!(ledger
            .record_module_completion(&mut account, 1, 0, now())
            .is_ok());
        assert!(ledger
            .record_module_completion(&mut account, 2, 100, now())
            .is_ok());
    }

    #[test]
    fn test_lesson_counter_clamps_at_total() {
        let ledger = ledger();
        let mut account = account_with_role(Role::Learner);
        let later = now() + Duration::hours(1);

        for _ in 0..5 {
            ledger.record_lesson_completion(&mut account, later);
        }
        assert_eq!(account.progress.completed_lessons, 3);
        assert_eq!(account.last_activity, later);
    }

    #[test]
    fn test_time_spent_accumulates() {
        let ledger = ledger();
        let mut account = account_with_role(Role::Learner);
        ledger.record_time_spent(&mut account, 25, now()).unwrap();
        ledger.record_time_spent(&mut account, 20, now()).unwrap();
        assert_eq!(account.progress.time_spent, 45);
        assert!(ledger.record_time_spent(&mut account, 0, now()).is_err());
    }
}
