use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tempt_core::{
    models::{BillingCycle, PlanTier, Subscription},
    AppError,
};
use uuid::Uuid;

use super::transaction::conflict_on_unique;

/// Repository for subscriptions (one row per user)
#[derive(Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "subscriptions", db.operation = "select"))]
    pub async fn get_for_user(&self, user_id: Uuid) -> Result<Option<Subscription>, AppError> {
        let sub = sqlx::query_as::<Postgres, Subscription>(
            "SELECT * FROM subscriptions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sub)
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "subscriptions", db.operation = "select"))]
    pub async fn get_for_user_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
    ) -> Result<Option<Subscription>, AppError> {
        let sub = sqlx::query_as::<Postgres, Subscription>(
            "SELECT * FROM subscriptions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(sub)
    }

    /// Start a subscription or replace the existing one with a fresh period
    #[tracing::instrument(skip(self, tx), fields(db.table = "subscriptions", db.operation = "upsert"))]
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        plan: PlanTier,
        billing_cycle: BillingCycle,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        payment_reference: &str,
    ) -> Result<Subscription, AppError> {
        sqlx::query_as::<Postgres, Subscription>(
            r#"
            INSERT INTO subscriptions (
                user_id, plan, billing_cycle, status, started_at,
                current_period_start, current_period_end, payment_reference
            )
            VALUES ($1, $2, $3, 'active', $4, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE SET
                plan = EXCLUDED.plan,
                billing_cycle = EXCLUDED.billing_cycle,
                status = 'active',
                started_at = CASE
                    WHEN subscriptions.plan = EXCLUDED.plan AND subscriptions.status <> 'expired'
                    THEN subscriptions.started_at
                    ELSE EXCLUDED.started_at
                END,
                current_period_start = EXCLUDED.current_period_start,
                current_period_end = EXCLUDED.current_period_end,
                cancel_at_period_end = FALSE,
                canceled_at = NULL,
                payment_reference = EXCLUDED.payment_reference,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(plan)
        .bind(billing_cycle)
        .bind(period_start)
        .bind(period_end)
        .bind(payment_reference)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| conflict_on_unique(e, "Payment reference was already recorded"))
    }

    /// Stop renewal; the plan stays effective until the period ends
    #[tracing::instrument(skip(self), fields(db.table = "subscriptions", db.operation = "update"))]
    pub async fn cancel(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Subscription>, AppError> {
        let sub = sqlx::query_as::<Postgres, Subscription>(
            r#"
            UPDATE subscriptions
            SET status = 'canceled', cancel_at_period_end = TRUE, canceled_at = $2, updated_at = NOW()
            WHERE user_id = $1 AND status IN ('active', 'trialing', 'past_due')
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sub)
    }

    /// Mark every subscription whose period ended as expired
    #[tracing::instrument(skip(self), fields(db.table = "subscriptions", db.operation = "update"))]
    pub async fn expire_lapsed(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'expired', updated_at = NOW()
            WHERE current_period_end <= $1 AND status <> 'expired'
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
