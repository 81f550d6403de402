use super::subscription::PlanTier;
use crate::access::Feature;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Plan limits and pricing for a tier
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Plan {
    pub tier: PlanTier,
    pub name: String,
    pub description: Option<String>,
    pub price_monthly_cents: i32,
    pub price_yearly_cents: i32,
    /// Nuts credited when a billing period starts
    pub monthly_nuts: i64,
    /// Images per billing period; `None` is unlimited
    pub image_quota: Option<i32>,
    /// Videos per billing period; `None` is unlimited
    pub video_quota: Option<i32>,
    /// Longest allowed image side in pixels
    pub max_resolution: i32,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Plan as shown on the pricing page
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanResponse {
    pub tier: PlanTier,
    pub name: String,
    pub description: Option<String>,
    pub price_monthly_cents: i32,
    pub price_yearly_cents: i32,
    pub monthly_nuts: i64,
    pub image_quota: Option<i32>,
    pub video_quota: Option<i32>,
    pub max_resolution: i32,
    pub features: Vec<Feature>,
}

impl From<Plan> for PlanResponse {
    fn from(plan: Plan) -> Self {
        PlanResponse {
            features: Feature::unlocked_by(plan.tier),
            tier: plan.tier,
            name: plan.name,
            description: plan.description,
            price_monthly_cents: plan.price_monthly_cents,
            price_yearly_cents: plan.price_yearly_cents,
            monthly_nuts: plan.monthly_nuts,
            image_quota: plan.image_quota,
            video_quota: plan.video_quota,
            max_resolution: plan.max_resolution,
        }
    }
}
