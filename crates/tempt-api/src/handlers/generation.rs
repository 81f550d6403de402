use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tempt_core::models::{
    GenerationAccepted, GenerationCallback, ImageGenerationRequest, TaskStatusReport,
    VideoGenerationRequest,
};

#[utoipa::path(
    post,
    path = "/api/v1/generations/images",
    tag = "generations",
    request_body = ImageGenerationRequest,
    responses(
        (status = 202, description = "Images queued", body = GenerationAccepted),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 402, description = "Plan, quota or balance insufficient", body = ErrorResponse),
        (status = 403, description = "Account restricted", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, req), fields(user_id = %ctx.user_id, operation = "generate_images"))]
pub async fn generate_images(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    ValidatedJson(req): ValidatedJson<ImageGenerationRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let accepted = state
        .generation
        .queue_images(ctx.user_id, req, Utc::now())
        .await?;
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

#[utoipa::path(
    post,
    path = "/api/v1/generations/videos",
    tag = "generations",
    request_body = VideoGenerationRequest,
    responses(
        (status = 202, description = "Video queued", body = GenerationAccepted),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 402, description = "Plan, quota or balance insufficient", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, req), fields(user_id = %ctx.user_id, operation = "generate_video"))]
pub async fn generate_video(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    ValidatedJson(req): ValidatedJson<VideoGenerationRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let accepted = state
        .generation
        .queue_video(ctx.user_id, req, Utc::now())
        .await?;
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

#[utoipa::path(
    get,
    path = "/api/v1/generations/{task_id}/status",
    tag = "generations",
    params(("task_id" = String, Path, description = "Task id returned when the job was queued")),
    responses(
        (status = 200, description = "Current status", body = TaskStatusReport),
        (status = 404, description = "Unknown task", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn task_status(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let report = state.generation.task_status(&ctx, &task_id).await?;
    Ok(Json(report))
}

/// Provider webhook. Authenticated by the shared callback secret.
#[utoipa::path(
    post,
    path = "/api/v1/generations/callback",
    tag = "generations",
    request_body = GenerationCallback,
    responses(
        (status = 200, description = "Status applied", body = TaskStatusReport),
        (status = 401, description = "Missing or wrong callback secret", body = ErrorResponse),
        (status = 404, description = "Unknown task", body = ErrorResponse),
        (status = 409, description = "Status cannot move backwards", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, callback), fields(task_id = %callback.task_id, operation = "generation_callback"))]
pub async fn generation_callback(
    State(state): State<Arc<AppState>>,
    ValidatedJson(callback): ValidatedJson<GenerationCallback>,
) -> Result<impl IntoResponse, HttpAppError> {
    let report = state
        .generation
        .apply_callback(callback, Utc::now())
        .await?;
    Ok(Json(report))
}
