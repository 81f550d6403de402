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
use tempt_core::access::Feature;
use tempt_core::models::{
    CreateSubscriptionRequest, PlanResponse, Subscription, SubscriptionOverview,
};
use tempt_core::FeatureAccess;

#[utoipa::path(
    get,
    path = "/api/v1/plans",
    tag = "billing",
    responses((status = 200, description = "Plans on offer", body = Vec<PlanResponse>))
)]
pub async fn list_plans(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.billing.plans().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/me/subscription",
    tag = "billing",
    responses(
        (status = 200, description = "Subscription, usage and unlocked features", body = SubscriptionOverview),
        (status = 404, description = "Profile not created yet", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn my_subscription(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let overview = state.billing.overview(ctx.user_id, Utc::now()).await?;
    Ok(Json(overview))
}

/// Billing provider webhook recording a confirmed payment. Authenticated by
/// the shared callback secret.
#[utoipa::path(
    post,
    path = "/api/v1/subscriptions",
    tag = "billing",
    request_body = CreateSubscriptionRequest,
    responses(
        (status = 201, description = "Subscription started or replaced", body = SubscriptionOverview),
        (status = 400, description = "Plan cannot be subscribed to", body = ErrorResponse),
        (status = 401, description = "Missing or wrong callback secret", body = ErrorResponse),
        (status = 403, description = "Account restricted", body = ErrorResponse),
        (status = 404, description = "Unknown user", body = ErrorResponse),
        (status = 409, description = "Payment already recorded", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, req), fields(user_id = %req.user_id, plan = %req.plan, operation = "subscribe"))]
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateSubscriptionRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let overview = state.billing.subscribe(req, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(overview)))
}

/// Stops renewal; the plan stays in force until the period ends.
#[utoipa::path(
    post,
    path = "/api/v1/subscriptions/cancel",
    tag = "billing",
    responses(
        (status = 200, description = "Subscription canceled at period end", body = Subscription),
        (status = 404, description = "No active subscription", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(user_id = %ctx.user_id, operation = "cancel_subscription"))]
pub async fn cancel_subscription(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
) -> Result<impl IntoResponse, HttpAppError> {
    let subscription = state.billing.cancel(ctx.user_id, Utc::now()).await?;
    Ok(Json(subscription))
}

#[utoipa::path(
    get,
    path = "/api/v1/features/{feature}",
    tag = "billing",
    params(("feature" = String, Path, description = "Feature name, e.g. video_generation")),
    responses(
        (status = 200, description = "Access decision", body = FeatureAccess),
        (status = 404, description = "Unknown feature", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn check_feature(
    State(state): State<Arc<AppState>>,
    ctx: UserContext,
    Path(feature): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let feature: Feature = feature.parse()?;
    let access = state
        .billing
        .check_feature(ctx.user_id, feature, Utc::now())
        .await?;
    Ok(Json(access))
}
