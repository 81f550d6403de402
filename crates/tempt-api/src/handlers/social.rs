use super::PageQuery;
use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tempt_core::models::{CastVoteRequest, CommentResponse, CreateCommentRequest, VoteOutcome};
use uuid::Uuid;

/// Sending the current vote value again retracts the vote.
#[utoipa::path(
    post,
    path = "/api/v1/images/{id}/vote",
    tag = "social",
    params(("id" = Uuid, Path, description = "Image ID")),
    request_body = CastVoteRequest,
    responses(
        (status = 200, description = "Vote applied", body = VoteOutcome),
        (status = 400, description = "Vote value must be 1 or -1", body = ErrorResponse),
        (status = 404, description = "Image not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, req), fields(user_id = %ctx.user_id, image_id = %id, value = req.value, operation = "vote"))]
pub async fn vote(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CastVoteRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let outcome = state.social.vote(&ctx, id, req, Utc::now()).await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    get,
    path = "/api/v1/images/{id}/comments",
    tag = "social",
    params(("id" = Uuid, Path, description = "Image ID"), PageQuery),
    responses(
        (status = 200, description = "Visible comments, oldest first", body = Vec<CommentResponse>),
        (status = 404, description = "Image not found", body = ErrorResponse)
    )
)]
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    viewer: Option<UserContext>,
    Path(id): Path<Uuid>,
    page: Result<Query<PageQuery>, QueryRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let Query(page) = page?;
    let (limit, offset) = page.bounds();
    let comments = state
        .social
        .comments(viewer.as_ref(), id, limit, offset)
        .await?;
    Ok(Json(comments))
}

#[utoipa::path(
    post,
    path = "/api/v1/images/{id}/comments",
    tag = "social",
    params(("id" = Uuid, Path, description = "Image ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment posted", body = CommentResponse),
        (status = 400, description = "Invalid comment", body = ErrorResponse),
        (status = 404, description = "Image not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, req), fields(user_id = %ctx.user_id, image_id = %id, operation = "add_comment"))]
pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let comment = state.social.add_comment(&ctx, id, req, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/comments/{id}",
    tag = "social",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 404, description = "Comment not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(user_id = %ctx.user_id, comment_id = %id, operation = "delete_comment"))]
pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.social.delete_comment(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
