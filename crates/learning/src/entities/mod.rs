//! Domain entities for the account and progression engine.
//!
//! Everything hangs off the [`Account`] aggregate; nested records are owned
//! values addressed by sequence number, never by reference.

pub mod account;
pub mod engagement;
pub mod progress;
pub mod subscription;

pub use account::{Account, NewAccount, Role, SecurityState};
pub use engagement::{
    Comment, EngagementRecord, Notification, NotificationType, Question, QuestionStatus,
};
pub use progress::{Certificate, ModuleCompletion, ModuleStatus, ProgressCounters};
pub use subscription::{EntitlementState, PlanTier, Subscription};
