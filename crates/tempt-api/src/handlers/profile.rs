use super::PageQuery;
use crate::auth::UserContext;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tempt_core::models::{CreateProfileRequest, NutsTransaction, User};

/// Create the profile for the token's subject. The signup bonus is
/// credited in the same transaction.
#[utoipa::path(
    post,
    path = "/api/v1/me",
    tag = "profile",
    request_body = CreateProfileRequest,
    responses(
        (status = 201, description = "Profile created", body = User),
        (status = 400, description = "Invalid email or username", body = ErrorResponse),
        (status = 409, description = "Profile, email or username already exists", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, req), fields(user_id = %ctx.user_id, operation = "create_profile"))]
pub async fn create_profile(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    ValidatedJson(req): ValidatedJson<CreateProfileRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let user = state.accounts.create_profile(ctx.user_id, req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/api/v1/me",
    tag = "profile",
    responses(
        (status = 200, description = "Caller's profile", body = User),
        (status = 404, description = "Profile not created yet", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.accounts.profile(ctx.user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/me/nuts",
    tag = "profile",
    params(PageQuery),
    responses((status = 200, description = "Nuts ledger, newest first", body = Vec<NutsTransaction>)),
    security(("bearer_auth" = []))
)]
pub async fn nuts_history(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    page: Result<Query<PageQuery>, QueryRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let Query(page) = page?;
    let (limit, offset) = page.bounds();
    let history = state
        .accounts
        .nuts_history(ctx.user_id, limit, offset)
        .await?;
    Ok(Json(history))
}
