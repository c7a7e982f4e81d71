//! Questions, lesson comments and notifications attached to an account.

use chrono::{DateTime, Utc};
use lectern_config::EngagementConfig;
use serde_json::Value;
use tracing::{debug, info};

use crate::entities::{
    Account, Comment, Notification, NotificationType, Question, QuestionStatus,
};
use crate::types::{
    AccountId, CommentId, LearningError, LearningResult, ModuleId, NotificationId, QuestionId,
};
use crate::utils::validation::validate_text;

const MAX_TITLE_LENGTH: usize = 200;
const MAX_MESSAGE_LENGTH: usize = 2000;
const MAX_LESSON_REF_LENGTH: usize = 100;

#[derive(Debug, Clone)]
pub struct EngagementLedger {
    max_comment_length: usize,
    max_question_length: usize,
}

impl EngagementLedger {
    pub fn new(config: &EngagementConfig) -> Self {
        Self {
            max_comment_length: config.max_comment_length,
            max_question_length: config.max_question_length,
        }
    }

    pub fn ask_question(
        &self,
        account: &mut Account,
        module_id: ModuleId,
        lesson_ref: Option<String>,
        text: &str,
        now: DateTime<Utc>,
    ) -> LearningResult<Question> {
        if module_id == 0 {
            return Err(LearningError::invalid("module ids start at 1"));
        }
        validate_text("question", text, self.max_question_length)?;
        let lesson_ref = match lesson_ref {
            Some(reference) => {
                validate_text("lesson reference", &reference, MAX_LESSON_REF_LENGTH)?;
                Some(reference.trim().to_string())
            }
            None => None,
        };

        let questions = &mut account.engagement.questions;
        let question = Question {
            id: questions.len() as QuestionId + 1,
            module_id,
            lesson_ref,
            text: text.trim().to_string(),
            answer: None,
            status: QuestionStatus::Pending,
            created_at: now,
            answered_at: None,
            answered_by: None,
        };
        questions.push(question.clone());
        account.touch(now);

        info!(
            account_id = account.id,
            question_id = question.id,
            module_id,
            "question asked"
        );
        Ok(question)
    }

    /// pending -> answered. Nothing is written when the transition is refused.
    pub fn answer_question(
        &self,
        account: &mut Account,
        question_id: QuestionId,
        answer: &str,
        actor: AccountId,
        now: DateTime<Utc>,
    ) -> LearningResult<Question> {
        validate_text("answer", answer, self.max_question_length)?;

        let question = find_question(account, question_id)?;
        question.status = question.status.transition_to(QuestionStatus::Answered)?;
        question.answer = Some(answer.trim().to_string());
        question.answered_at = Some(now);
        question.answered_by = Some(actor);
        let answered = question.clone();

        info!(
            account_id = account.id,
            question_id,
            answered_by = actor,
            "question answered"
        );
        Ok(answered)
    }

    /// answered -> closed. Closed is terminal.
    pub fn close_question(
        &self,
        account: &mut Account,
        question_id: QuestionId,
    ) -> LearningResult<Question> {
        let question = find_question(account, question_id)?;
        question.status = question.status.transition_to(QuestionStatus::Closed)?;
        let closed = question.clone();

        debug!(account_id = account.id, question_id, "question closed");
        Ok(closed)
    }

    pub fn add_comment(
        &self,
        account: &mut Account,
        lesson_ref: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> LearningResult<Comment> {
        validate_text("lesson reference", lesson_ref, MAX_LESSON_REF_LENGTH)?;
        validate_text("comment", text, self.max_comment_length)?;

        let comments = &mut account.engagement.comments;
        let comment = Comment {
            id: comments.len() as CommentId + 1,
            lesson_ref: lesson_ref.trim().to_string(),
            content: text.trim().to_string(),
            created_at: now,
            is_edited: false,
            edited_at: None,
        };
        comments.push(comment.clone());
        account.touch(now);

        debug!(account_id = account.id, comment_id = comment.id, "comment added");
        Ok(comment)
    }

    pub fn edit_comment(
        &self,
        account: &mut Account,
        comment_id: CommentId,
        text: &str,
        now: DateTime<Utc>,
    ) -> LearningResult<Comment> {
        validate_text("comment", text, self.max_comment_length)?;

        let comment = account
            .engagement
            .comments
            .iter_mut()
            .find(|comment| comment.id == comment_id)
            .ok_or_else(|| LearningError::not_found(format!("Comment {comment_id}")))?;
        comment.content = text.trim().to_string();
        comment.is_edited = true;
        comment.edited_at = Some(now);

        Ok(comment.clone())
    }

    /// Append an unread notification. Repeated pushes are not deduplicated.
    pub fn push_notification(
        &self,
        account: &mut Account,
        notification_type: NotificationType,
        title: &str,
        message: &str,
        data: Value,
        now: DateTime<Utc>,
    ) -> LearningResult<Notification> {
        validate_text("notification title", title, MAX_TITLE_LENGTH)?;
        validate_text("notification message", message, MAX_MESSAGE_LENGTH)?;

        let notifications = &mut account.engagement.notifications;
        let notification = Notification {
            id: notifications.len() as NotificationId + 1,
            notification_type,
            title: title.trim().to_string(),
            message: message.trim().to_string(),
            is_read: false,
            created_at: now,
            data,
        };
        notifications.push(notification.clone());

        debug!(
            account_id = account.id,
            notification_id = notification.id,
            kind = notification_type.as_str(),
            "notification appended"
        );
        Ok(notification)
    }

    pub fn mark_notification_read(
        &self,
        account: &mut Account,
        notification_id: NotificationId,
    ) -> LearningResult<Notification> {
        let notification = account
            .engagement
            .notifications
            .iter_mut()
            .find(|notification| notification.id == notification_id)
            .ok_or_else(|| LearningError::not_found(format!("Notification {notification_id}")))?;
        notification.is_read = true;
        Ok(notification.clone())
    }

    /// Returns how many notifications flipped to read.
    pub fn mark_all_notifications_read(&self, account: &mut Account) -> usize {
        let mut changed = 0;
        for notification in account
            .engagement
            .notifications
            .iter_mut()
            .filter(|notification| !notification.is_read)
        {
            notification.is_read = true;
            changed += 1;
        }
        changed
    }

    pub fn unread_count(&self, account: &Account) -> usize {
        account.engagement.unread_count()
    }
}

fn find_question(account: &mut Account, question_id: QuestionId) -> LearningResult<&mut Question> {
    account
        .engagement
        .questions
        .iter_mut()
        .find(|question| question.id == question_id)
        .ok_or_else(|| LearningError::not_found(format!("Question {question_id}")))
}
