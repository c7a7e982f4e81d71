//! Read-only summaries for presentation layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::progression_ledger::ProgressionLedger;
use crate::entities::{Account, ModuleStatus};
use crate::types::ModuleId;

/// Rounded share of completed lessons, 0 when the course has no lessons.
pub fn progress_percentage(completed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (f64::from(completed) / f64::from(total) * 100.0).round() as u32
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModuleStatusEntry {
    pub module_id: ModuleId,
    pub status: ModuleStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardSummary {
    pub progress_percentage: u32,
    pub completed_lessons: u32,
    pub total_lessons: u32,
    pub current_module: ModuleId,
    pub total_modules: u32,
    pub completed_modules: usize,
    pub average_score: Option<f64>,
    pub time_spent_minutes: u64,
    pub entitled: bool,
    pub subscription_days_left: i64,
    pub unread_notifications: usize,
    pub pending_questions: usize,
    pub certificates: usize,
    pub modules: Vec<ModuleStatusEntry>,
}

#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    total_modules: u32,
}

impl ProgressAggregator {
    pub fn new(total_modules: u32) -> Self {
        Self { total_modules }
    }

    pub fn total_modules(&self) -> u32 {
        self.total_modules
    }

    pub fn module_statuses(
        &self,
        ledger: &ProgressionLedger,
        account: &Account,
    ) -> Vec<ModuleStatusEntry> {
        (1..=self.total_modules)
            .map(|module_id| {
                let status = if account.completion_for(module_id).is_some() {
                    ModuleStatus::Completed
                } else if !ledger.can_access_module(account, module_id) {
                    ModuleStatus::Locked
                } else {
                    ModuleStatus::InProgress
                };
                ModuleStatusEntry { module_id, status }
            })
            .collect()
    }

    pub fn summarize(
        &self,
        ledger: &ProgressionLedger,
        account: &Account,
        at: DateTime<Utc>,
    ) -> DashboardSummary {
        let progress = &account.progress;
        let average_score = if account.completions.is_empty() {
            None
        } else {
            let total: u32 = account
                .completions
                .iter()
                .map(|completion| u32::from(completion.score))
                .sum();
            Some(f64::from(total) / account.completions.len() as f64)
        };

        DashboardSummary {
            progress_percentage: progress_percentage(
                progress.completed_lessons,
                progress.total_lessons,
            ),
            completed_lessons: progress.completed_lessons,
            total_lessons: progress.total_lessons,
            current_module: progress.current_module,
            total_modules: self.total_modules,
            completed_modules: account.completions.len(),
            average_score,
            time_spent_minutes: progress.time_spent,
            entitled: account.subscription.is_entitled(at),
            subscription_days_left: account.subscription.days_remaining(at),
            unread_notifications: account.engagement.unread_count(),
            pending_questions: account.engagement.pending_questions(),
            certificates: account.certificates.len(),
            modules: self.module_statuses(ledger, account),
        }
    }
}
