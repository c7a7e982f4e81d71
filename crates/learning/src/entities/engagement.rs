//! Append-only engagement logs: questions, lesson comments, notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AccountId, CommentId, LearningError, ModuleId, NotificationId, QuestionId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuestionStatus {
    Pending,
    Answered,
    Closed,
}

impl QuestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionStatus::Pending => "pending",
            QuestionStatus::Answered => "answered",
            QuestionStatus::Closed => "closed",
        }
    }

    /// pending -> answered -> closed, nothing else.
    pub fn can_transition_to(&self, next: QuestionStatus) -> bool {
        matches!(
            (self, next),
            (QuestionStatus::Pending, QuestionStatus::Answered)
                | (QuestionStatus::Answered, QuestionStatus::Closed)
        )
    }

    pub fn transition_to(&self, next: QuestionStatus) -> Result<QuestionStatus, LearningError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(LearningError::InvalidStateTransition {
                entity: "question",
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: QuestionId,
    pub module_id: ModuleId,
    pub lesson_ref: Option<String>,
    pub text: String,
    pub answer: Option<String>,
    pub status: QuestionStatus,
    pub created_at: DateTime<Utc>,
    pub answered_at: Option<DateTime<Utc>>,
    pub answered_by: Option<AccountId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: CommentId,
    pub lesson_ref: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    LessonAvailable,
    TestReminder,
    QuestionAnswered,
    SubscriptionExpiring,
    System,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::LessonAvailable => "lesson_available",
            NotificationType::TestReminder => "test_reminder",
            NotificationType::QuestionAnswered => "question_answered",
            NotificationType::SubscriptionExpiring => "subscription_expiring",
            NotificationType::System => "system",
        }
    }
}

impl std::str::FromStr for NotificationType {
    type Err = LearningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lesson_available" => Ok(NotificationType::LessonAvailable),
            "test_reminder" => Ok(NotificationType::TestReminder),
            "question_answered" => Ok(NotificationType::QuestionAnswered),
            "subscription_expiring" => Ok(NotificationType::SubscriptionExpiring),
            "system" => Ok(NotificationType::System),
            other => Err(LearningError::invalid(format!(
                "unknown notification type '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: NotificationId,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngagementRecord {
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

impl EngagementRecord {
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|question| question.id == id)
    }

    pub fn unread_count(&self) -> usize {
        self.notifications
            .iter()
            .filter(|notification| !notification.is_read)
            .count()
    }

    pub fn pending_questions(&self) -> usize {
        self.questions
            .iter()
            .filter(|question| question.status == QuestionStatus::Pending)
            .count()
    }
}
