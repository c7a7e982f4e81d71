use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use lectern_learning::{Comment, CommentId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{util::require_bearer, ApiError, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCommentRequest {
    pub lesson_ref: String,
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCommentRequest {
    pub content: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommentResponse {
    #[schema(value_type = Object)]
    pub comment: Comment,
}

#[utoipa::path(
    post,
    path = "/api/comments",
    tag = "Comments",
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment added", body = CommentResponse),
        (status = 400, description = "Empty or oversized comment", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;
    let comment = state
        .learners()
        .add_comment(account.id, &payload.lesson_ref, &payload.content)
        .await?;
    Ok((StatusCode::CREATED, Json(CommentResponse { comment })))
}

#[utoipa::path(
    put,
    path = "/api/comments/{id}",
    tag = "Comments",
    params(("id" = u64, Path, description = "Comment id within the caller's log")),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Comment edited", body = CommentResponse),
        (status = 404, description = "Comment not found", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<CommentId>,
    headers: HeaderMap,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<CommentResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;
    let comment = state
        .learners()
        .edit_comment(account.id, comment_id, &payload.content)
        .await?;
    Ok(Json(CommentResponse { comment }))
}
