use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Generation counters for one user and billing period
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UsageRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub images_generated: i32,
    pub videos_generated: i32,
    pub nuts_spent: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Usage with the limits that apply to it
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsageResponse {
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub images_generated: i32,
    pub image_quota: Option<i32>,
    pub image_usage_percent: Option<f64>,
    pub videos_generated: i32,
    pub video_quota: Option<i32>,
    pub video_usage_percent: Option<f64>,
    pub nuts_spent: i64,
}
