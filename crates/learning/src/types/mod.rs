//! Shared types for the engine.

pub mod errors;

pub use errors::{LearningError, LearningResult};

// Common type aliases
pub type AccountId = i64;
pub type ModuleId = u32;
pub type QuestionId = u64;
pub type CommentId = u64;
pub type NotificationId = u64;
