//! Quota and currency arithmetic
//!
//! Pricing of generation requests in nuts, per-period quota checks against a
//! plan, and billing period boundaries.

use chrono::{DateTime, Datelike, Months, TimeZone, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::models::{
    BillingCycle, GenerationKind, ImageGenerationRequest, Plan, UsageRecord, UsageResponse,
    VideoGenerationRequest,
};

pub const IMAGE_BASE_COST: i64 = 1;
pub const VIDEO_BASE_COST: i64 = 10;
/// Added per image when the longest side exceeds `HIGH_RESOLUTION_THRESHOLD`
pub const HIGH_RESOLUTION_SURCHARGE: i64 = 1;
/// Added per image when advanced sampler options are set
pub const ADVANCED_SURCHARGE: i64 = 1;
pub const HIGH_RESOLUTION_THRESHOLD: u32 = 1024;
/// Video base cost covers this many seconds; longer clips pay per started block
pub const VIDEO_BLOCK_SECONDS: u32 = 5;

/// Pricing inputs extracted from a generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostInput {
    pub kind: GenerationKind,
    pub count: u32,
    pub high_resolution: bool,
    pub advanced: bool,
    pub duration_seconds: u32,
}

impl CostInput {
    pub fn image(req: &ImageGenerationRequest) -> Self {
        CostInput {
            kind: GenerationKind::Image,
            count: req.count,
            high_resolution: req.longest_side() > HIGH_RESOLUTION_THRESHOLD,
            advanced: req.advanced.is_some(),
            duration_seconds: 0,
        }
    }

    pub fn video(req: &VideoGenerationRequest) -> Self {
        CostInput {
            kind: GenerationKind::Video,
            count: 1,
            high_resolution: false,
            advanced: false,
            duration_seconds: req.duration_seconds,
        }
    }
}

/// Nuts charged for a generation request.
pub fn generation_cost(input: &CostInput) -> i64 {
    let count = i64::from(input.count.max(1));
    match input.kind {
        GenerationKind::Image => {
            let mut per_item = IMAGE_BASE_COST;
            if input.high_resolution {
                per_item += HIGH_RESOLUTION_SURCHARGE;
            }
            if input.advanced {
                per_item += ADVANCED_SURCHARGE;
            }
            per_item * count
        }
        GenerationKind::Video => {
            let blocks = input.duration_seconds.max(1).div_ceil(VIDEO_BLOCK_SECONDS);
            VIDEO_BASE_COST * i64::from(blocks) * count
        }
    }
}

/// Reject a charge the balance cannot cover.
pub fn ensure_balance(balance: i64, cost: i64) -> Result<(), AppError> {
    if cost > balance {
        return Err(AppError::InsufficientNuts {
            balance,
            required: cost,
        });
    }
    Ok(())
}

/// Result of a period quota check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct QuotaCheck {
    pub allowed: bool,
    pub used: i64,
    /// `None` is unlimited
    pub limit: Option<i64>,
    pub remaining: Option<i64>,
}

impl QuotaCheck {
    pub fn into_result(self, kind: GenerationKind) -> Result<(), AppError> {
        match self.limit {
            Some(limit) if !self.allowed => Err(AppError::UsageLimitExceeded {
                resource: format!("{}s", kind),
                used: self.used,
                limit,
            }),
            _ => Ok(()),
        }
    }
}

/// Check whether `requested` more generations of `kind` fit in the plan's period quota.
pub fn check_quota(
    plan: &Plan,
    usage: Option<&UsageRecord>,
    kind: GenerationKind,
    requested: u32,
) -> QuotaCheck {
    let (used, limit) = match kind {
        GenerationKind::Image => (
            usage.map_or(0, |u| u.images_generated),
            plan.image_quota,
        ),
        GenerationKind::Video => (
            usage.map_or(0, |u| u.videos_generated),
            plan.video_quota,
        ),
    };
    let used = i64::from(used);

    match limit {
        None => QuotaCheck {
            allowed: true,
            used,
            limit: None,
            remaining: None,
        },
        Some(limit) => {
            let limit = i64::from(limit);
            QuotaCheck {
                allowed: used + i64::from(requested) <= limit,
                used,
                limit: Some(limit),
                remaining: Some((limit - used).max(0)),
            }
        }
    }
}

/// Share of the quota consumed, capped at 100. `None` when unlimited.
pub fn usage_percent(used: i32, limit: Option<i32>) -> Option<f64> {
    let limit = limit?;
    if limit <= 0 {
        return Some(100.0);
    }
    Some((f64::from(used) / f64::from(limit) * 100.0).min(100.0))
}

/// End of a billing period that starts at `anchor`.
///
/// Month arithmetic clamps to the last day of shorter months, so a period
/// anchored on Jan 31 ends on Feb 28 (or 29).
pub fn period_end(anchor: DateTime<Utc>, cycle: BillingCycle) -> Result<DateTime<Utc>, AppError> {
    let months = match cycle {
        BillingCycle::Monthly => Months::new(1),
        BillingCycle::Yearly => Months::new(12),
    };
    anchor
        .checked_add_months(months)
        .ok_or_else(|| AppError::Internal(format!("Billing period overflows from {}", anchor)))
}

pub fn period_bounds(
    anchor: DateTime<Utc>,
    cycle: BillingCycle,
) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    Ok((anchor, period_end(anchor, cycle)?))
}

/// Calendar month containing `now`; the usage period for users without a subscription.
pub fn calendar_month(now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let start = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .ok_or_else(|| AppError::Internal(format!("Invalid month start for {}", now)))?;
    period_bounds(start, BillingCycle::Monthly)
}

/// Usage counters with the plan's limits applied.
pub fn usage_summary(plan: Option<&Plan>, usage: Option<&UsageRecord>) -> UsageResponse {
    let image_quota = plan.and_then(|p| p.image_quota);
    let video_quota = plan.and_then(|p| p.video_quota);
    let images = usage.map_or(0, |u| u.images_generated);
    let videos = usage.map_or(0, |u| u.videos_generated);

    UsageResponse {
        period_start: usage.map(|u| u.period_start),
        period_end: usage.map(|u| u.period_end),
        images_generated: images,
        image_quota,
        image_usage_percent: usage_percent(images, image_quota),
        videos_generated: videos,
        video_quota,
        video_usage_percent: usage_percent(videos, video_quota),
        nuts_spent: usage.map_or(0, |u| u.nuts_spent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlanTier;
    use uuid::Uuid;

    fn plan(image_quota: Option<i32>, video_quota: Option<i32>) -> Plan {
        let now = Utc::now();
        Plan {
            tier: PlanTier::Basic,
            name: "Basic".to_string(),
            description: None,
            price_monthly_cents: 999,
            price_yearly_cents: 9990,
            monthly_nuts: 200,
            image_quota,
            video_quota,
            max_resolution: 1024,
            is_active: true,
            sort_order: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn usage(images: i32, videos: i32) -> UsageRecord {
        let now = Utc::now();
        UsageRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            period_start: now,
            period_end: now,
            images_generated: images,
            videos_generated: videos,
            nuts_spent: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn image_cost(count: u32, high_resolution: bool, advanced: bool) -> i64 {
        generation_cost(&CostInput {
            kind: GenerationKind::Image,
            count,
            high_resolution,
            advanced,
            duration_seconds: 0,
        })
    }

    #[test]
    fn image_cost_scales_with_count_and_surcharges() {
        assert_eq!(image_cost(1, false, false), 1);
        assert_eq!(image_cost(4, false, false), 4);
        assert_eq!(image_cost(1, true, false), 2);
        assert_eq!(image_cost(2, true, true), 6);
    }

    #[test]
    fn video_cost_is_charged_per_started_block() {
        let cost = |secs| {
            generation_cost(&CostInput {
                kind: GenerationKind::Video,
                count: 1,
                high_resolution: false,
                advanced: false,
                duration_seconds: secs,
            })
        };
        assert_eq!(cost(1), 10);
        assert_eq!(cost(5), 10);
        assert_eq!(cost(6), 20);
        assert_eq!(cost(30), 60);
    }

    #[test]
    fn balance_must_cover_cost() {
        assert!(ensure_balance(10, 10).is_ok());
        match ensure_balance(3, 10) {
            Err(AppError::InsufficientNuts { balance, required }) => {
                assert_eq!((balance, required), (3, 10))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn quota_counts_requested_items() {
        let p = plan(Some(10), Some(0));
        let check = check_quota(&p, Some(&usage(8, 0)), GenerationKind::Image, 2);
        assert!(check.allowed);
        assert_eq!(check.remaining, Some(2));

        let check = check_quota(&p, Some(&usage(8, 0)), GenerationKind::Image, 3);
        assert!(!check.allowed);
        assert!(matches!(
            check.into_result(GenerationKind::Image),
            Err(AppError::UsageLimitExceeded { used: 8, limit: 10, .. })
        ));

        let check = check_quota(&p, None, GenerationKind::Video, 1);
        assert!(!check.allowed);
        assert_eq!(check.remaining, Some(0));
    }

    #[test]
    fn unlimited_quota_always_allows() {
        let p = plan(None, None);
        let check = check_quota(&p, Some(&usage(100_000, 5_000)), GenerationKind::Image, 4);
        assert!(check.allowed);
        assert_eq!(check.limit, None);
        assert!(check.into_result(GenerationKind::Image).is_ok());
    }

    #[test]
    fn usage_percent_is_capped() {
        assert_eq!(usage_percent(5, None), None);
        assert_eq!(usage_percent(5, Some(10)), Some(50.0));
        assert_eq!(usage_percent(15, Some(10)), Some(100.0));
        assert_eq!(usage_percent(0, Some(0)), Some(100.0));
    }

    #[test]
    fn monthly_period_clamps_to_month_end() {
        let jan31 = Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap();
        let end = period_end(jan31, BillingCycle::Monthly).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 2, 28, 12, 0, 0).unwrap());

        let leap = Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap();
        let end = period_end(leap, BillingCycle::Yearly).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 2, 28, 0, 0, 0).unwrap());
    }

    #[test]
    fn calendar_month_bounds() {
        let now = Utc.with_ymd_and_hms(2025, 12, 15, 8, 30, 0).unwrap();
        let (start, end) = calendar_month(now).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn usage_summary_applies_plan_limits() {
        let p = plan(Some(20), None);
        let summary = usage_summary(Some(&p), Some(&usage(5, 2)));
        assert_eq!(summary.image_usage_percent, Some(25.0));
        assert_eq!(summary.video_usage_percent, None);
        assert_eq!(summary.videos_generated, 2);

        let empty = usage_summary(None, None);
        assert_eq!(empty.images_generated, 0);
        assert_eq!(empty.period_start, None);
    }
}
