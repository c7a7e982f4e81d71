//! Error types for the account and progression engine.

use thiserror::Error;

/// Every recoverable condition the engine reports to its callers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LearningError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cannot move {entity} from {from} to {to}")]
    InvalidStateTransition {
        entity: &'static str,
        from: &'static str,
        to: &'static str,
    },

    /// Authentication was attempted during an active lockout. Carries only the
    /// remaining lock duration, never anything about the attempted password.
    #[error("Account is locked for another {remaining_seconds} seconds")]
    AccountLocked { remaining_seconds: i64 },

    #[error("No active subscription")]
    NotEntitled,

    #[error("Module {module_id} is locked")]
    ModuleLocked { module_id: u32 },

    #[error("{0} not found")]
    NotFound(String),

    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl LearningError {
    pub fn invalid(message: impl Into<String>) -> Self {
        LearningError::InvalidInput(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        LearningError::NotFound(what.into())
    }

    /// Remaining lockout rounded up to whole minutes, for user-facing messages.
    pub fn lock_remaining_minutes(&self) -> Option<i64> {
        match self {
            LearningError::AccountLocked { remaining_seconds } => {
                Some((remaining_seconds + 59) / 60)
            }
            _ => None,
        }
    }
}

pub type LearningResult<T> = Result<T, LearningError>;
