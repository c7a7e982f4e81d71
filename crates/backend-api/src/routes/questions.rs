use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use lectern_learning::{ModuleId, Question, QuestionId, Role};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{util::require_bearer, ApiError, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AskQuestionRequest {
    pub module_id: ModuleId,
    pub lesson_ref: Option<String>,
    pub text: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AnswerQuestionRequest {
    /// Public id of the learner who asked.
    pub account_id: String,
    pub answer: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionResponse {
    #[schema(value_type = Object)]
    pub question: Question,
}

#[utoipa::path(
    post,
    path = "/api/questions",
    tag = "Questions",
    request_body = AskQuestionRequest,
    responses(
        (status = 201, description = "Question logged", body = QuestionResponse),
        (status = 400, description = "Empty or oversized question", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn ask_question(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AskQuestionRequest>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;
    let question = state
        .learners()
        .ask_question(account.id, payload.module_id, payload.lesson_ref, &payload.text)
        .await?;
    Ok((StatusCode::CREATED, Json(QuestionResponse { question })))
}

/// Staff answer a learner's question; the learner gets a notification.
#[utoipa::path(
    post,
    path = "/api/questions/{id}/answer",
    tag = "Questions",
    params(("id" = u64, Path, description = "Question id within the learner's log")),
    request_body = AnswerQuestionRequest,
    responses(
        (status = 200, description = "Question answered", body = QuestionResponse),
        (status = 403, description = "Caller may not answer questions", body = crate::error::ErrorResponse),
        (status = 404, description = "Learner or question not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Question already closed", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn answer_question(
    State(state): State<AppState>,
    Path(question_id): Path<QuestionId>,
    headers: HeaderMap,
    Json(payload): Json<AnswerQuestionRequest>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let actor = state
        .authenticate_with(&token, Role::can_answer_questions)
        .await?;

    let learners = state.learners();
    let learner = learners
        .find_by_public_id(&payload.account_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Account {} not found", payload.account_id)))?;

    let question = learners
        .answer_question(learner.id, question_id, &payload.answer, actor.id)
        .await?;

    info!(
        learner = %learner.public_id,
        question_id,
        answered_by = %actor.public_id,
        "question answered"
    );
    Ok(Json(QuestionResponse { question }))
}

#[utoipa::path(
    post,
    path = "/api/questions/{id}/close",
    tag = "Questions",
    params(("id" = u64, Path, description = "Question id within the caller's log")),
    responses(
        (status = 200, description = "Question closed", body = QuestionResponse),
        (status = 404, description = "Question not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Question already closed", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn close_question(
    State(state): State<AppState>,
    Path(question_id): Path<QuestionId>,
    headers: HeaderMap,
) -> Result<Json<QuestionResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;
    let question = state
        .learners()
        .close_question(account.id, question_id)
        .await?;
    Ok(Json(QuestionResponse { question }))
}
