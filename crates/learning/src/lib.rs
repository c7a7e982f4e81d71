//! # Lectern Learning Crate
//!
//! The learner account and progression engine: credential lockout,
//! subscription lifecycle, module gating, engagement logs and progress
//! summaries for the Lectern course platform.
//!
//! ## Architecture
//!
//! - **Entities**: the `Account` aggregate and its embedded records
//! - **Services**: the engine components and `LearnerService`
//! - **Repositories**: `AccountStore` / `SessionStore` plus in-memory stores
//! - **Types**: error type and id aliases
//! - **Utils**: validation and clocks
//!
//! ## Usage
//!
//! ```rust
//! use lectern_config::EngineConfig;
//! use lectern_learning::{LearnerService, MemoryAccountStore, NewAccount, Role};
//!
//! # async fn demo() -> lectern_learning::LearningResult<()> {
//! let service = LearnerService::with_system_clock(MemoryAccountStore::new(), &EngineConfig::default());
//! let account = service
//!     .register(
//!         NewAccount { name: "Anna".into(), email: "anna@example.com".into(), role: Role::Learner },
//!         "$argon2id$...".into(),
//!     )
//!     .await?;
//! service.record_module_completion(account.id, 1, 85).await?;
//! # Ok(())
//! # }
//! ```

pub mod entities;
pub mod repositories;
pub mod services;
pub mod types;
pub mod utils;

pub use entities::{
    Account, Certificate, Comment, EngagementRecord, EntitlementState, ModuleCompletion,
    ModuleStatus, NewAccount, Notification, NotificationType, PlanTier, ProgressCounters,
    Question, QuestionStatus, Role, SecurityState, Subscription,
};
pub use repositories::{
    AccountStore, MemoryAccountStore, MemorySessionStore, SessionRecord, SessionStore,
};
pub use services::{
    progress_percentage, CompletionOutcome, CredentialGuard, DashboardSummary,
    EngagementLedger, LearnerService, LoginAttempt, ModuleStatusEntry, ProgressAggregator,
    ProgressionLedger, SubscriptionManager, SubscriptionStatus, SweepReport,
};
pub use types::{
    AccountId, CommentId, LearningError, LearningResult, ModuleId, NotificationId, QuestionId,
};
pub use utils::{Clock, ManualClock, SystemClock};
