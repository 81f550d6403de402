//! Plans, subscriptions and feature checks

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tempt_core::access::{accessible_features, check_feature_access, Feature, SubscriptionState};
use tempt_core::models::{
    CreateSubscriptionRequest, NutsTransactionKind, PlanResponse, Subscription,
    SubscriptionOverview, User,
};
use tempt_core::quota::{period_bounds, usage_summary};
use tempt_core::{AppError, FeatureAccess};
use tempt_db::transaction::{begin, commit};
use uuid::Uuid;
use validator::Validate;

use super::generation::usage_period;
use crate::state::Repositories;

#[derive(Clone)]
pub struct BillingService {
    pool: PgPool,
    repos: Repositories,
}

impl BillingService {
    pub fn new(pool: PgPool, repos: Repositories) -> Self {
        Self { pool, repos }
    }

    async fn load_user(&self, user_id: Uuid) -> Result<User, AppError> {
        self.repos
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
    }

    /// Active plans for the pricing page
    pub async fn plans(&self) -> Result<Vec<PlanResponse>, AppError> {
        let plans = self.repos.plans.list_active().await?;
        Ok(plans.into_iter().map(PlanResponse::from).collect())
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn overview(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SubscriptionOverview, AppError> {
        let user = self.load_user(user_id).await?;
        let subscription = self.repos.subscriptions.get_for_user(user_id).await?;
        let state = SubscriptionState::from_user(&user, subscription.as_ref());
        let effective = state.effective_plan(now);

        let plan = self.repos.plans.get(effective).await?;
        let (period_start, _) = usage_period(subscription.as_ref(), effective, now)?;
        let usage = self.repos.usage.get(user_id, period_start).await?;

        Ok(SubscriptionOverview {
            effective_plan: effective,
            usage: usage_summary(Some(&plan), usage.as_ref()),
            plan: Some(PlanResponse::from(plan)),
            subscription,
            features: accessible_features(&state, now),
            nuts_balance: user.nuts_balance,
        })
    }

    /// Record a confirmed payment: start or replace the subscription and
    /// credit the plan's monthly nuts.
    #[tracing::instrument(skip(self, req), fields(user_id = %req.user_id, plan = %req.plan))]
    pub async fn subscribe(
        &self,
        req: CreateSubscriptionRequest,
        now: DateTime<Utc>,
    ) -> Result<SubscriptionOverview, AppError> {
        req.validate()?;
        let user_id = req.user_id;
        if !req.plan.is_paid() {
            return Err(AppError::InvalidInput(
                "The free plan does not need a subscription".to_string(),
            ));
        }

        let mut tx = begin(&self.pool).await?;
        let user = self.repos.users.lock_tx(&mut tx, user_id).await?;
        if user.is_banned {
            return Err(AppError::AccountRestricted("Account is banned".to_string()));
        }
        let current = self
            .repos
            .subscriptions
            .get_for_user_tx(&mut tx, user_id)
            .await?;
        if current.and_then(|s| s.payment_reference).as_deref() == Some(req.payment_reference.as_str()) {
            return Err(AppError::Conflict("Payment already recorded".to_string()));
        }

        let plan = self.repos.plans.get_tx(&mut tx, req.plan).await?;
        if !plan.is_active {
            return Err(AppError::InvalidInput(format!(
                "The {} plan is no longer offered",
                plan.tier
            )));
        }

        let (period_start, period_end) = period_bounds(now, req.billing_cycle)?;
        let subscription = self
            .repos
            .subscriptions
            .upsert_tx(
                &mut tx,
                user_id,
                req.plan,
                req.billing_cycle,
                period_start,
                period_end,
                &req.payment_reference,
            )
            .await?;

        if plan.monthly_nuts > 0 {
            let note = format!("{} plan grant", plan.tier);
            self.repos
                .nuts
                .apply_tx(
                    &mut tx,
                    user_id,
                    NutsTransactionKind::SubscriptionGrant,
                    plan.monthly_nuts,
                    Some(subscription.id),
                    Some(note.as_str()),
                )
                .await?;
        }
        commit(tx).await?;

        tracing::info!(
            user_id = %user_id,
            plan = %subscription.plan,
            period_end = %subscription.current_period_end,
            "Subscription recorded"
        );

        self.overview(user_id, now).await
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn cancel(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<Subscription, AppError> {
        let subscription = self
            .repos
            .subscriptions
            .cancel(user_id, now)
            .await?
            .ok_or_else(|| AppError::NotFound("No active subscription".to_string()))?;

        tracing::info!(
            user_id = %user_id,
            active_until = %subscription.current_period_end,
            "Subscription canceled"
        );
        Ok(subscription)
    }

    pub async fn check_feature(
        &self,
        user_id: Uuid,
        feature: Feature,
        now: DateTime<Utc>,
    ) -> Result<FeatureAccess, AppError> {
        let user = self.load_user(user_id).await?;
        let subscription = self.repos.subscriptions.get_for_user(user_id).await?;
        let state = SubscriptionState::from_user(&user, subscription.as_ref());
        Ok(check_feature_access(&state, feature, now))
    }
}
