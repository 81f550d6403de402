use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tempt_core::{models::UsageRecord, AppError};
use uuid::Uuid;

/// Repository for per-period usage counters
#[derive(Clone)]
pub struct UsageRepository {
    pool: PgPool,
}

impl UsageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "usage_records", db.operation = "select"))]
    pub async fn get(
        &self,
        user_id: Uuid,
        period_start: DateTime<Utc>,
    ) -> Result<Option<UsageRecord>, AppError> {
        let record = sqlx::query_as::<Postgres, UsageRecord>(
            "SELECT * FROM usage_records WHERE user_id = $1 AND period_start = $2",
        )
        .bind(user_id)
        .bind(period_start)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Fetch the period's row, creating it with zero counters on first use
    #[tracing::instrument(skip(self, tx), fields(db.table = "usage_records", db.operation = "upsert"))]
    pub async fn get_or_create_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<UsageRecord, AppError> {
        let record = sqlx::query_as::<Postgres, UsageRecord>(
            r#"
            INSERT INTO usage_records (user_id, period_start, period_end)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, period_start) DO UPDATE SET period_end = EXCLUDED.period_end
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(period_start)
        .bind(period_end)
        .fetch_one(&mut **tx)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "usage_records", db.operation = "update", db.record_id = %id))]
    pub async fn record_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        images: i32,
        videos: i32,
        nuts: i64,
    ) -> Result<UsageRecord, AppError> {
        let record = sqlx::query_as::<Postgres, UsageRecord>(
            r#"
            UPDATE usage_records
            SET images_generated = images_generated + $2,
                videos_generated = videos_generated + $3,
                nuts_spent = nuts_spent + $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(images)
        .bind(videos)
        .bind(nuts)
        .fetch_one(&mut **tx)
        .await?;

        Ok(record)
    }

    /// Give back quota for a failed generation on the row it was charged to
    #[tracing::instrument(skip(self, tx), fields(db.table = "usage_records", db.operation = "update", db.record_id = %id))]
    pub async fn release_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        images: i32,
        videos: i32,
        nuts: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE usage_records
            SET images_generated = GREATEST(images_generated - $2, 0),
                videos_generated = GREATEST(videos_generated - $3, 0),
                nuts_spent = GREATEST(nuts_spent - $4, 0),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(images)
        .bind(videos)
        .bind(nuts)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
