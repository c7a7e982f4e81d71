use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use cuid2::CuidConstructor;
use serde::{Deserialize, Serialize};

use super::engagement::EngagementRecord;
use super::progress::{Certificate, ModuleCompletion, ProgressCounters};
use super::subscription::Subscription;
use crate::types::{AccountId, LearningError, LearningResult};
use crate::utils::validation::{normalize_email, validate_display_name, validate_email};

static CUID: Lazy<CuidConstructor> = Lazy::new(CuidConstructor::new);

/// Account role. A closed set; gating decisions dispatch on it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Learner,
    Curator,
    Manager,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Learner => "learner",
            Role::Curator => "curator",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }

    /// Curators and admins see every module regardless of completions.
    pub fn bypasses_gating(&self) -> bool {
        matches!(self, Role::Curator | Role::Admin)
    }

    pub fn can_answer_questions(&self) -> bool {
        matches!(self, Role::Curator | Role::Manager | Role::Admin)
    }

    pub fn can_confirm_payments(&self) -> bool {
        matches!(self, Role::Manager | Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = LearningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            // older records used "student"
            "learner" | "student" => Ok(Role::Learner),
            "curator" => Ok(Role::Curator),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            other => Err(LearningError::invalid(format!("unknown role '{other}'"))),
        }
    }
}

/// Brute-force protection state. Mutated only by the credential guard.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SecurityState {
    pub failed_attempts: u32,
    pub lock_until: Option<DateTime<Utc>>,
}

/// The per-account aggregate. Everything the engine knows about a learner is
/// co-located here so a store can persist it in one atomic write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Store-assigned key, 0 until persisted
    pub id: AccountId,
    pub public_id: String,
    pub name: String,
    /// Always lowercase
    pub email: String,
    /// Argon2 PHC string. Kept out of every serialized form.
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub email_verified: bool,
    #[serde(default)]
    pub security: SecurityState,
    #[serde(default)]
    pub subscription: Subscription,
    pub progress: ProgressCounters,
    #[serde(default)]
    pub completions: Vec<ModuleCompletion>,
    #[serde(default)]
    pub certificates: Vec<Certificate>,
    #[serde(default)]
    pub engagement: EngagementRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// Registration input, validated before an [`Account`] is built from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

impl NewAccount {
    pub fn validate(&self) -> LearningResult<()> {
        validate_display_name(&self.name)?;
        validate_email(&normalize_email(&self.email))?;
        Ok(())
    }
}

impl Account {
    /// Build a fresh account from validated registration input.
    pub fn new(
        request: NewAccount,
        password_hash: String,
        total_lessons: u32,
        now: DateTime<Utc>,
    ) -> LearningResult<Self> {
        request.validate()?;

        if password_hash.is_empty() {
            return Err(LearningError::invalid("password hash is required"));
        }

        Ok(Self {
            id: 0,
            public_id: CUID.create_id(),
            name: request.name.trim().to_string(),
            email: normalize_email(&request.email),
            password_hash,
            role: request.role,
            is_active: true,
            email_verified: false,
            security: SecurityState::default(),
            subscription: Subscription::default(),
            progress: ProgressCounters::new(total_lessons),
            completions: Vec::new(),
            certificates: Vec::new(),
            engagement: EngagementRecord::default(),
            created_at: now,
            updated_at: now,
            last_activity: now,
        })
    }

    pub fn completion_for(&self, module_id: u32) -> Option<&ModuleCompletion> {
        self.completions
            .iter()
            .find(|completion| completion.module_id == module_id)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    /// Deactivation flips a flag; accounts are never removed.
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }
}
