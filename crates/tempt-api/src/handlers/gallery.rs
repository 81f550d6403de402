use super::PageQuery;
use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::is_visible;
use crate::state::AppState;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tempt_core::access::Feature;
use tempt_core::models::{
    GalleryQuery, GenerationStatus, ImageResponse, UpdateImageRequest, VideoResponse,
};
use tempt_core::AppError;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/v1/images",
    tag = "gallery",
    params(
        ("category" = Option<String>, Query, description = "Category slug"),
        ("sort" = Option<String>, Query, description = "newest (default) or top"),
        ("limit" = Option<i64>, Query, description = "Page size, at most 100"),
        ("offset" = Option<i64>, Query, description = "Rows to skip")
    ),
    responses(
        (status = 200, description = "Public gallery page", body = Vec<ImageResponse>),
        (status = 404, description = "Unknown category", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query), fields(operation = "list_gallery"))]
pub async fn list_gallery(
    State(state): State<Arc<AppState>>,
    query: Result<Query<GalleryQuery>, QueryRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let Query(query) = query?;

    let category_id = match query.category.as_deref() {
        Some(slug) => Some(
            state
                .repos
                .categories
                .get_by_slug(slug)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Unknown category: {}", slug)))?
                .id,
        ),
        None => None,
    };

    let rows = state.repos.images.list_public(&query, category_id).await?;
    let images: Vec<ImageResponse> = rows
        .into_iter()
        .map(|(image, author)| ImageResponse::from(image).with_author(author))
        .collect();

    Ok(Json(images))
}

#[utoipa::path(
    get,
    path = "/api/v1/images/{id}",
    tag = "gallery",
    params(("id" = Uuid, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Image found", body = ImageResponse),
        (status = 404, description = "Image not found", body = ErrorResponse)
    )
)]
pub async fn get_image(
    State(state): State<Arc<AppState>>,
    viewer: Option<UserContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let (image, author) = state
        .repos
        .images
        .get_with_author(id)
        .await?
        .filter(|(image, _)| is_visible(image, viewer.as_ref()))
        .ok_or_else(|| AppError::NotFound("Image not found".to_string()))?;

    Ok(Json(ImageResponse::from(image).with_author(author)))
}

/// Owner edits: visibility and category. Making an image private needs
/// the private gallery feature.
#[utoipa::path(
    patch,
    path = "/api/v1/images/{id}",
    tag = "gallery",
    params(("id" = Uuid, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Image updated", body = ImageResponse),
        (status = 402, description = "Private gallery needs a paid plan", body = ErrorResponse),
        (status = 404, description = "Image not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, req), fields(user_id = %ctx.user_id, image_id = %id, operation = "update_image"))]
pub async fn update_image(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateImageRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    state
        .repos
        .images
        .get(id)
        .await?
        .filter(|image| image.user_id == ctx.user_id)
        .ok_or_else(|| AppError::NotFound("Image not found".to_string()))?;

    if req.is_public == Some(false) {
        state
            .billing
            .check_feature(ctx.user_id, Feature::PrivateGallery, Utc::now())
            .await?
            .into_result()?;
    }
    if let Some(Some(category_id)) = req.category_id {
        if !state.repos.categories.exists(category_id).await? {
            return Err(AppError::InvalidInput("Unknown category".to_string()).into());
        }
    }

    let image = state
        .repos
        .images
        .update(id, req.is_public, req.category_id)
        .await?;
    Ok(Json(ImageResponse::from(image)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/images/{id}",
    tag = "gallery",
    params(("id" = Uuid, Path, description = "Image ID")),
    responses(
        (status = 204, description = "Image deleted"),
        (status = 404, description = "Image not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(user_id = %ctx.user_id, image_id = %id, operation = "delete_image"))]
pub async fn delete_image(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state
        .repos
        .images
        .get(id)
        .await?
        .filter(|image| image.user_id == ctx.user_id)
        .ok_or_else(|| AppError::NotFound("Image not found".to_string()))?;

    state.repos.images.delete(id).await?;
    tracing::info!(image_id = %id, "Image deleted by owner");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/me/images",
    tag = "gallery",
    params(PageQuery),
    responses((status = 200, description = "Caller's images, newest first", body = Vec<ImageResponse>)),
    security(("bearer_auth" = []))
)]
pub async fn my_images(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    page: Result<Query<PageQuery>, QueryRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let Query(page) = page?;
    let (limit, offset) = page.bounds();
    let images = state
        .repos
        .images
        .list_for_user(ctx.user_id, limit, offset)
        .await?;
    Ok(Json(
        images
            .into_iter()
            .map(ImageResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/videos/{id}",
    tag = "gallery",
    params(("id" = Uuid, Path, description = "Video ID")),
    responses(
        (status = 200, description = "Video found", body = VideoResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    )
)]
pub async fn get_video(
    State(state): State<Arc<AppState>>,
    viewer: Option<UserContext>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let video = state
        .repos
        .videos
        .get(id)
        .await?
        .filter(|video| {
            (video.is_public && video.status == GenerationStatus::Completed)
                || viewer.is_some_and(|ctx| ctx.can_manage(video.user_id))
        })
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))?;

    Ok(Json(VideoResponse::from(video)))
}

#[utoipa::path(
    get,
    path = "/api/v1/me/videos",
    tag = "gallery",
    params(PageQuery),
    responses((status = 200, description = "Caller's videos, newest first", body = Vec<VideoResponse>)),
    security(("bearer_auth" = []))
)]
pub async fn my_videos(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    page: Result<Query<PageQuery>, QueryRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let Query(page) = page?;
    let (limit, offset) = page.bounds();
    let videos = state
        .repos
        .videos
        .list_for_user(ctx.user_id, limit, offset)
        .await?;
    Ok(Json(
        videos
            .into_iter()
            .map(VideoResponse::from)
            .collect::<Vec<_>>(),
    ))
}
