//! services/api/src/web/comments.rs
//!
//! REST handlers for comment threads under a notice.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::dto::{CommentDto, CommentThreadDto};
use crate::web::middleware::{CurrentUser, JsonBody, PathParam, Viewer};
use crate::web::rest::ApiResponse;
use crate::web::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub notice_id: Uuid,
    pub content: String,
    /// Set to reply to a top-level comment on the same notice.
    #[serde(default)]
    pub parent_comment_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCommentRequest {
    pub content: String,
}

/// GET /comments/notice/{notice_id} - Threads of a notice, newest first
#[utoipa::path(
    get,
    path = "/comments/notice/{notice_id}",
    params(("notice_id" = Uuid, Path, description = "Notice id")),
    responses(
        (status = 200, description = "Top-level comments with their replies", body = [CommentThreadDto]),
        (status = 404, description = "Notice not found")
    )
)]
pub async fn list_comments_handler(
    State(state): State<Arc<AppState>>,
    Viewer(viewer): Viewer,
    PathParam(notice_id): PathParam<Uuid>,
) -> Result<ApiResponse<Vec<CommentThreadDto>>, ApiError> {
    let threads = state
        .comments
        .list_for_notice(viewer.as_ref(), notice_id)
        .await?;
    Ok(ApiResponse::ok(
        threads.into_iter().map(CommentThreadDto::from).collect(),
    ))
}

/// POST /comments - Comment on a notice or reply to a comment
#[utoipa::path(
    post,
    path = "/comments",
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentDto),
        (status = 400, description = "Empty content or invalid parent"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Notice not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_comment_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    JsonBody(req): JsonBody<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .comments
        .create_comment(&user, req.notice_id, &req.content, req.parent_comment_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok_with_message(CommentDto::from(comment), "Comment added successfully"),
    ))
}

/// PUT /comments/{id} - Edit a comment (author or admin)
#[utoipa::path(
    put,
    path = "/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment id")),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Comment edited", body = CommentDto),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Comment not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_comment_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    PathParam(comment_id): PathParam<Uuid>,
    JsonBody(req): JsonBody<UpdateCommentRequest>,
) -> Result<ApiResponse<CommentDto>, ApiError> {
    let comment = state
        .comments
        .edit_comment(&user, comment_id, &req.content)
        .await?;
    Ok(ApiResponse::ok_with_message(comment.into(), "Comment updated successfully"))
}

/// DELETE /comments/{id} - Delete a comment and its replies (author or admin)
#[utoipa::path(
    delete,
    path = "/comments/{id}",
    params(("id" = Uuid, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Comment not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_comment_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    PathParam(comment_id): PathParam<Uuid>,
) -> Result<ApiResponse<()>, ApiError> {
    state.comments.delete_comment(&user, comment_id).await?;
    Ok(ApiResponse::message("Comment deleted successfully"))
}
