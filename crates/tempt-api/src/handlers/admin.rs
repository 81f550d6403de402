//! Admin and moderation endpoints
//!
//! User management and nuts grants are admin-only; image removal and comment
//! hiding are open to moderators. Role checks happen in the route layers.

use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tempt_core::models::{
    AdminUserQuery, BanUserRequest, Category, CreateCategoryRequest, GrantNutsRequest,
    NutsTransaction, SuspendUserRequest, User,
};
use tempt_core::AppError;
use uuid::Uuid;
use validator::Validate;

#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    tag = "admin",
    params(
        ("search" = Option<String>, Query, description = "Match on username or email"),
        ("banned_only" = Option<bool>, Query, description = "Only banned accounts"),
        ("limit" = Option<i64>, Query, description = "Page size"),
        ("offset" = Option<i64>, Query, description = "Rows to skip")
    ),
    responses(
        (status = 200, description = "Users", body = Vec<User>),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AdminUserQuery>, QueryRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let Query(query) = query?;
    Ok(Json(state.repos.users.list(&query).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/ban",
    tag = "admin",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = BanUserRequest,
    responses(
        (status = 200, description = "User banned", body = User),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, req), fields(admin_id = %ctx.user_id, user_id = %id, operation = "ban_user"))]
pub async fn ban_user(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<BanUserRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    req.validate()?;
    if id == ctx.user_id {
        return Err(AppError::BadRequest("Admins cannot ban themselves".to_string()).into());
    }
    let user = state
        .repos
        .users
        .set_ban(id, true, req.reason.as_deref())
        .await?;
    tracing::info!(user_id = %id, "User banned");
    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/unban",
    tag = "admin",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Ban lifted", body = User),
        (status = 400, description = "Cannot unban yourself", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(admin_id = %ctx.user_id, user_id = %id, operation = "unban_user"))]
pub async fn unban_user(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    if id == ctx.user_id {
        return Err(AppError::BadRequest("Admins cannot unban themselves".to_string()).into());
    }
    let user = state.repos.users.set_ban(id, false, None).await?;
    tracing::info!(user_id = %id, "User unbanned");
    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/suspend",
    tag = "admin",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = SuspendUserRequest,
    responses(
        (status = 200, description = "User suspended", body = User),
        (status = 400, description = "End time in the past", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, req), fields(admin_id = %ctx.user_id, user_id = %id, operation = "suspend_user"))]
pub async fn suspend_user(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<SuspendUserRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    req.validate()?;
    if req.until.is_some_and(|until| until <= chrono::Utc::now()) {
        return Err(AppError::InvalidInput("suspension end must be in the future".to_string()).into());
    }
    let user = state.repos.users.set_suspension(id, true, req.until).await?;
    tracing::info!(user_id = %id, until = ?req.until, reason = ?req.reason, "User suspended");
    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/unsuspend",
    tag = "admin",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Suspension lifted", body = User),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(admin_id = %ctx.user_id, user_id = %id, operation = "unsuspend_user"))]
pub async fn unsuspend_user(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let user = state.repos.users.set_suspension(id, false, None).await?;
    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/nuts",
    tag = "admin",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = GrantNutsRequest,
    responses(
        (status = 201, description = "Nuts credited", body = NutsTransaction),
        (status = 400, description = "Invalid amount", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, req), fields(admin_id = %ctx.user_id, user_id = %id, operation = "grant_nuts"))]
pub async fn grant_nuts(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<GrantNutsRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    req.validate()?;
    let entry = state
        .accounts
        .grant_nuts(ctx.user_id, id, req.amount, req.note.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/images/{id}",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Image ID")),
    responses(
        (status = 204, description = "Image removed"),
        (status = 404, description = "Image not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(moderator_id = %ctx.user_id, image_id = %id, operation = "remove_image"))]
pub async fn remove_image(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    if !state.repos.images.delete(id).await? {
        return Err(AppError::NotFound("Image not found".to_string()).into());
    }
    tracing::info!(image_id = %id, "Image removed by moderator");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/comments/{id}/hide",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Comment hidden"),
        (status = 404, description = "Comment not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn hide_comment(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.social.hide_comment(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/categories",
    tag = "admin",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 409, description = "Slug already taken", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, req), fields(admin_id = %ctx.user_id, slug = %req.slug, operation = "create_category"))]
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    ValidatedJson(req): ValidatedJson<CreateCategoryRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    req.validate()?;
    let category = state.repos.categories.create(&req).await?;
    Ok((StatusCode::CREATED, Json(category)))
}
