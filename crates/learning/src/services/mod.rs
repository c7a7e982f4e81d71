//! Engine components and the store-backed service that composes them.

pub mod credential_guard;
pub mod engagement_ledger;
pub mod learner_service;
pub mod progress_aggregator;
pub mod progression_ledger;
pub mod subscription_manager;

pub use credential_guard::CredentialGuard;
pub use engagement_ledger::EngagementLedger;
pub use learner_service::{LearnerService, LoginAttempt, SubscriptionStatus, SweepReport};
pub use progress_aggregator::{
    progress_percentage, DashboardSummary, ModuleStatusEntry, ProgressAggregator,
};
pub use progression_ledger::{CompletionOutcome, ProgressionLedger};
pub use subscription_manager::SubscriptionManager;
