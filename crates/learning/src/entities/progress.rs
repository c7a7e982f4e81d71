use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ModuleId;

/// Lesson and module counters embedded in an account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressCounters {
    pub completed_lessons: u32,
    /// Course constant, copied from configuration at registration
    pub total_lessons: u32,
    /// Highest unlocked module index; never decreases
    pub current_module: ModuleId,
    /// Minutes
    pub time_spent: u64,
}

impl ProgressCounters {
    pub fn new(total_lessons: u32) -> Self {
        Self {
            completed_lessons: 0,
            total_lessons,
            current_module: 1,
            time_spent: 0,
        }
    }
}

impl Default for ProgressCounters {
    fn default() -> Self {
        Self::new(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleCompletion {
    pub module_id: ModuleId,
    pub completed_at: DateTime<Utc>,
    /// 0..=100
    pub score: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Certificate {
    pub module_id: ModuleId,
    pub issued_at: DateTime<Utc>,
    pub certificate_url: String,
}

/// Display status of a module on the dashboard.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleStatus {
    Completed,
    InProgress,
    Locked,
}

impl ModuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleStatus::Completed => "completed",
            ModuleStatus::InProgress => "in-progress",
            ModuleStatus::Locked => "locked",
        }
    }
}
