use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use lectern_learning::{
    Certificate, CompletionOutcome, DashboardSummary, LearningError, ModuleId, ProgressCounters,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{util::require_bearer, ApiError, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct ProgressResponse {
    #[schema(value_type = Object)]
    pub progress: ProgressCounters,
    pub progress_percentage: u32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ModuleResultRequest {
    /// Test score, 0..=100.
    pub score: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ModuleResultResponse {
    pub module_id: ModuleId,
    /// False when the module already had a result; the stored score is kept.
    pub recorded: bool,
    pub passed: bool,
    pub score: u8,
    #[schema(value_type = Option<Object>)]
    pub certificate: Option<Certificate>,
    pub current_module: ModuleId,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TimeSpentRequest {
    pub minutes: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    #[schema(value_type = Object)]
    pub dashboard: DashboardSummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ModuleAccessResponse {
    pub module_id: ModuleId,
    pub accessible: bool,
    /// `not_entitled` or `module_locked` when access is refused.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

fn progress_response(progress: ProgressCounters) -> ProgressResponse {
    let progress_percentage =
        lectern_learning::progress_percentage(progress.completed_lessons, progress.total_lessons);
    ProgressResponse {
        progress,
        progress_percentage,
    }
}

#[utoipa::path(
    post,
    path = "/api/progress/lessons",
    tag = "Progress",
    responses(
        (status = 200, description = "Lesson counted", body = ProgressResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn complete_lesson(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ProgressResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;
    let progress = state
        .learners()
        .record_lesson_completion(account.id)
        .await?;
    Ok(Json(progress_response(progress)))
}

/// Submit a module test result. The module must be reachable for the caller.
#[utoipa::path(
    post,
    path = "/api/progress/modules/{module_id}",
    tag = "Progress",
    params(("module_id" = u32, Path, description = "Module number, starting at 1")),
    request_body = ModuleResultRequest,
    responses(
        (status = 200, description = "Result recorded or already present", body = ModuleResultResponse),
        (status = 400, description = "Score out of range", body = crate::error::ErrorResponse),
        (status = 402, description = "No active subscription", body = crate::error::ErrorResponse),
        (status = 403, description = "Module still locked", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn complete_module(
    State(state): State<AppState>,
    Path(module_id): Path<ModuleId>,
    headers: HeaderMap,
    Json(payload): Json<ModuleResultRequest>,
) -> Result<Json<ModuleResultResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;
    let learners = state.learners();
    learners.check_module_access(&account, module_id)?;

    let outcome = learners
        .record_module_completion(account.id, module_id, payload.score)
        .await?;
    let stored = learners.get_account(account.id).await?;

    let (recorded, certificate) = match outcome {
        CompletionOutcome::Recorded { certificate, .. } => (true, certificate),
        CompletionOutcome::AlreadyRecorded { .. } => (false, None),
    };
    let score = stored
        .completion_for(module_id)
        .map(|completion| completion.score)
        .ok_or_else(|| ApiError::internal_server_error("completion missing after write"))?;

    Ok(Json(ModuleResultResponse {
        module_id,
        recorded,
        passed: score >= learners.progression().pass_score(),
        score,
        certificate,
        current_module: stored.progress.current_module,
    }))
}

#[utoipa::path(
    post,
    path = "/api/progress/time",
    tag = "Progress",
    request_body = TimeSpentRequest,
    responses(
        (status = 200, description = "Study time added", body = ProgressResponse),
        (status = 400, description = "Minutes must be positive", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn add_time_spent(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<TimeSpentRequest>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;
    let progress = state
        .learners()
        .record_time_spent(account.id, payload.minutes)
        .await?;
    Ok(Json(progress_response(progress)))
}

#[utoipa::path(
    get,
    path = "/api/dashboard",
    tag = "Progress",
    responses(
        (status = 200, description = "Progress summary", body = DashboardResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DashboardResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;
    let dashboard = state.learners().dashboard(account.id).await?;
    Ok(Json(DashboardResponse { dashboard }))
}

#[utoipa::path(
    get,
    path = "/api/modules/{module_id}/access",
    tag = "Progress",
    params(("module_id" = u32, Path, description = "Module number, starting at 1")),
    responses(
        (status = 200, description = "Access decision", body = ModuleAccessResponse),
        (status = 400, description = "Module 0 requested", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn module_access(
    State(state): State<AppState>,
    Path(module_id): Path<ModuleId>,
    headers: HeaderMap,
) -> Result<Json<ModuleAccessResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;

    let reason = match state.learners().check_module_access(&account, module_id) {
        Ok(()) => None,
        Err(LearningError::NotEntitled) => Some("not_entitled"),
        Err(LearningError::ModuleLocked { .. }) => Some("module_locked"),
        Err(other) => return Err(other.into()),
    };

    Ok(Json(ModuleAccessResponse {
        module_id,
        accessible: reason.is_none(),
        reason: reason.map(str::to_string),
    }))
}
