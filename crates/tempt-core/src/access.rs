//! Feature-access rules
//!
//! Maps a user's subscription state to access decisions. Every feature has a
//! static allow-list of plan tiers; banned and suspended accounts are denied
//! before the table is consulted. All functions here are pure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::models::{PlanTier, Subscription, SubscriptionStatus, User};

use PlanTier::{Basic, Free, Pro, Unlimited};

/// Gated product features
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    ImageGeneration,
    AdvancedGeneration,
    HighResolution,
    BatchGeneration,
    VideoGeneration,
    PrivateGallery,
    NoWatermark,
    CommercialLicense,
    PriorityQueue,
    /// Voting and commenting
    SocialInteraction,
}

impl Feature {
    pub const ALL: [Feature; 10] = [
        Feature::ImageGeneration,
        Feature::AdvancedGeneration,
        Feature::HighResolution,
        Feature::BatchGeneration,
        Feature::VideoGeneration,
        Feature::PrivateGallery,
        Feature::NoWatermark,
        Feature::CommercialLicense,
        Feature::PriorityQueue,
        Feature::SocialInteraction,
    ];

    /// Plan tiers that unlock this feature.
    pub fn allowed_plans(&self) -> &'static [PlanTier] {
        match self {
            Feature::ImageGeneration | Feature::SocialInteraction => {
                &[Free, Basic, Pro, Unlimited]
            }
            Feature::AdvancedGeneration | Feature::PrivateGallery | Feature::NoWatermark => {
                &[Basic, Pro, Unlimited]
            }
            Feature::HighResolution
            | Feature::BatchGeneration
            | Feature::VideoGeneration
            | Feature::CommercialLicense => &[Pro, Unlimited],
            Feature::PriorityQueue => &[Unlimited],
        }
    }

    /// Cheapest tier in the allow-list.
    pub fn required_plan(&self) -> PlanTier {
        self.allowed_plans()
            .iter()
            .copied()
            .min()
            .unwrap_or(Unlimited)
    }

    pub fn is_allowed_for(&self, plan: PlanTier) -> bool {
        self.allowed_plans().contains(&plan)
    }

    /// Every feature a tier unlocks, in declaration order.
    pub fn unlocked_by(plan: PlanTier) -> Vec<Feature> {
        Feature::ALL
            .iter()
            .copied()
            .filter(|f| f.is_allowed_for(plan))
            .collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::ImageGeneration => "image_generation",
            Feature::AdvancedGeneration => "advanced_generation",
            Feature::HighResolution => "high_resolution",
            Feature::BatchGeneration => "batch_generation",
            Feature::VideoGeneration => "video_generation",
            Feature::PrivateGallery => "private_gallery",
            Feature::NoWatermark => "no_watermark",
            Feature::CommercialLicense => "commercial_license",
            Feature::PriorityQueue => "priority_queue",
            Feature::SocialInteraction => "social_interaction",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| AppError::NotFound(format!("Unknown feature: {}", s)))
    }
}

/// Why access was denied
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    Banned,
    Suspended,
    PlanRequired,
}

/// Outcome of a feature check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct FeatureAccess {
    pub feature: Feature,
    pub has_access: bool,
    /// Cheapest tier that unlocks the feature; set when the plan is the obstacle
    pub required_plan: Option<PlanTier>,
    pub reason: Option<DenialReason>,
}

impl FeatureAccess {
    /// Turn a denial into the matching `AppError`.
    pub fn into_result(self) -> Result<(), AppError> {
        match self.reason {
            None if self.has_access => Ok(()),
            Some(DenialReason::Banned) => {
                Err(AppError::AccountRestricted("Account is banned".to_string()))
            }
            Some(DenialReason::Suspended) => {
                Err(AppError::AccountRestricted("Account is suspended".to_string()))
            }
            _ => Err(AppError::SubscriptionRequired {
                feature: self.feature.to_string(),
                required_plan: self.required_plan.unwrap_or(self.feature.required_plan()),
            }),
        }
    }
}

/// Everything the rules need to know about a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionState {
    pub plan: PlanTier,
    pub status: SubscriptionStatus,
    /// `None` for plans without a billing period (the free tier)
    pub current_period_end: Option<DateTime<Utc>>,
    pub is_banned: bool,
    pub is_suspended: bool,
    pub suspended_until: Option<DateTime<Utc>>,
}

impl SubscriptionState {
    /// A user in good standing on the free tier.
    pub fn free() -> Self {
        SubscriptionState {
            plan: Free,
            status: SubscriptionStatus::Active,
            current_period_end: None,
            is_banned: false,
            is_suspended: false,
            suspended_until: None,
        }
    }

    pub fn from_user(user: &User, subscription: Option<&Subscription>) -> Self {
        let mut state = match subscription {
            Some(sub) => SubscriptionState {
                plan: sub.plan,
                status: sub.status,
                current_period_end: Some(sub.current_period_end),
                ..SubscriptionState::free()
            },
            None => SubscriptionState::free(),
        };
        state.is_banned = user.is_banned;
        state.is_suspended = user.is_suspended;
        state.suspended_until = user.suspended_until;
        state
    }

    /// The tier that currently grants features.
    ///
    /// Canceled, expired and past-due subscriptions fall back to free once
    /// their period has ended. Active and trialing ones keep their plan until
    /// the sweeper marks them expired.
    pub fn effective_plan(&self, now: DateTime<Utc>) -> PlanTier {
        let period_ended = self.current_period_end.is_some_and(|end| end <= now);
        match self.status {
            SubscriptionStatus::Canceled
            | SubscriptionStatus::Expired
            | SubscriptionStatus::PastDue
                if period_ended =>
            {
                Free
            }
            _ => self.plan,
        }
    }

    pub fn is_suspended_at(&self, now: DateTime<Utc>) -> bool {
        self.is_suspended && self.suspended_until.map_or(true, |until| until > now)
    }
}

/// Decide whether `state` may use `feature` at time `now`.
pub fn check_feature_access(
    state: &SubscriptionState,
    feature: Feature,
    now: DateTime<Utc>,
) -> FeatureAccess {
    if state.is_banned {
        return FeatureAccess {
            feature,
            has_access: false,
            required_plan: None,
            reason: Some(DenialReason::Banned),
        };
    }
    if state.is_suspended_at(now) {
        return FeatureAccess {
            feature,
            has_access: false,
            required_plan: None,
            reason: Some(DenialReason::Suspended),
        };
    }

    let plan = state.effective_plan(now);
    if feature.is_allowed_for(plan) {
        FeatureAccess {
            feature,
            has_access: true,
            required_plan: None,
            reason: None,
        }
    } else {
        FeatureAccess {
            feature,
            has_access: false,
            required_plan: Some(feature.required_plan()),
            reason: Some(DenialReason::PlanRequired),
        }
    }
}

/// Every feature `state` may use at `now`.
pub fn accessible_features(state: &SubscriptionState, now: DateTime<Utc>) -> Vec<Feature> {
    Feature::ALL
        .iter()
        .copied()
        .filter(|f| check_feature_access(state, *f, now).has_access)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn state(plan: PlanTier) -> SubscriptionState {
        SubscriptionState {
            plan,
            status: SubscriptionStatus::Active,
            current_period_end: Some(Utc::now() + Duration::days(30)),
            ..SubscriptionState::free()
        }
    }

    #[test]
    fn access_matches_allow_list_for_every_pair() {
        let now = Utc::now();
        for plan in PlanTier::ALL {
            for feature in Feature::ALL {
                let access = check_feature_access(&state(plan), feature, now);
                assert_eq!(
                    access.has_access,
                    feature.allowed_plans().contains(&plan),
                    "{feature} on {plan}"
                );
                if !access.has_access {
                    assert_eq!(access.reason, Some(DenialReason::PlanRequired));
                    assert_eq!(access.required_plan, Some(feature.required_plan()));
                }
            }
        }
    }

    #[test]
    fn banned_users_are_denied_everything() {
        let now = Utc::now();
        for plan in PlanTier::ALL {
            let mut s = state(plan);
            s.is_banned = true;
            for feature in Feature::ALL {
                let access = check_feature_access(&s, feature, now);
                assert!(!access.has_access);
                assert_eq!(access.reason, Some(DenialReason::Banned));
                assert_eq!(access.required_plan, None);
            }
        }
    }

    #[test]
    fn ban_takes_precedence_over_suspension() {
        let mut s = state(Unlimited);
        s.is_banned = true;
        s.is_suspended = true;
        let access = check_feature_access(&s, Feature::ImageGeneration, Utc::now());
        assert_eq!(access.reason, Some(DenialReason::Banned));
    }

    #[test]
    fn suspension_blocks_until_it_ends() {
        let now = Utc::now();
        let mut s = state(Pro);
        s.is_suspended = true;
        s.suspended_until = Some(now + Duration::hours(1));

        let during = check_feature_access(&s, Feature::VideoGeneration, now);
        assert_eq!(during.reason, Some(DenialReason::Suspended));

        let after = check_feature_access(&s, Feature::VideoGeneration, now + Duration::hours(2));
        assert!(after.has_access);
    }

    #[test]
    fn lapsed_subscription_falls_back_to_free() {
        let now = Utc::now();
        let mut s = state(Pro);
        s.status = SubscriptionStatus::Canceled;
        s.current_period_end = Some(now - Duration::days(1));
        assert_eq!(s.effective_plan(now), Free);
        assert!(!check_feature_access(&s, Feature::VideoGeneration, now).has_access);
        assert!(check_feature_access(&s, Feature::ImageGeneration, now).has_access);
    }

    #[test]
    fn canceled_subscription_keeps_plan_until_period_end() {
        let now = Utc::now();
        let mut s = state(Basic);
        s.status = SubscriptionStatus::Canceled;
        assert_eq!(s.effective_plan(now), Basic);
    }

    #[test]
    fn lapsed_statuses_fall_back_only_after_period_end() {
        let now = Utc::now();
        for status in [
            SubscriptionStatus::Canceled,
            SubscriptionStatus::Expired,
            SubscriptionStatus::PastDue,
        ] {
            let mut s = state(Unlimited);
            s.status = status;
            assert_eq!(s.effective_plan(now), Unlimited, "{status:?} before period end");
            s.current_period_end = Some(now - Duration::minutes(1));
            assert_eq!(s.effective_plan(now), Free, "{status:?} after period end");
        }
    }

    #[test]
    fn active_subscription_keeps_plan_until_marked_expired() {
        let now = Utc::now();
        for status in [SubscriptionStatus::Active, SubscriptionStatus::Trialing] {
            let mut s = state(Pro);
            s.status = status;
            s.current_period_end = Some(now - Duration::minutes(1));
            assert_eq!(s.effective_plan(now), Pro);
        }
    }

    #[test]
    fn required_plan_is_cheapest_allowed_tier() {
        assert_eq!(Feature::ImageGeneration.required_plan(), Free);
        assert_eq!(Feature::AdvancedGeneration.required_plan(), Basic);
        assert_eq!(Feature::VideoGeneration.required_plan(), Pro);
        assert_eq!(Feature::PriorityQueue.required_plan(), Unlimited);
    }

    #[test]
    fn feature_keys_round_trip_through_str() {
        for feature in Feature::ALL {
            assert_eq!(feature.as_str().parse::<Feature>().unwrap(), feature);
            let json = serde_json::to_string(&feature).unwrap();
            assert_eq!(json, format!("\"{}\"", feature.as_str()));
        }
        assert!("teleportation".parse::<Feature>().is_err());
    }

    #[test]
    fn denial_maps_to_app_error() {
        let now = Utc::now();
        let denied = check_feature_access(&state(Free), Feature::VideoGeneration, now);
        match denied.into_result() {
            Err(AppError::SubscriptionRequired { required_plan, .. }) => {
                assert_eq!(required_plan, Pro)
            }
            other => panic!("unexpected {:?}", other),
        }

        let mut banned = state(Pro);
        banned.is_banned = true;
        let denied = check_feature_access(&banned, Feature::ImageGeneration, now);
        assert!(matches!(
            denied.into_result(),
            Err(AppError::AccountRestricted(_))
        ));
    }

    #[test]
    fn accessible_features_grow_with_tier() {
        let now = Utc::now();
        let counts: Vec<usize> = PlanTier::ALL
            .iter()
            .map(|p| accessible_features(&state(*p), now).len())
            .collect();
        assert!(counts.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(counts[3], Feature::ALL.len());
    }
}
