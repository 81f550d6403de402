use sqlx::{PgPool, Postgres, Transaction};
use tempt_core::{
    models::{Plan, PlanTier},
    AppError,
};

/// Repository for the plan catalogue
#[derive(Clone)]
pub struct PlanRepository {
    pool: PgPool,
}

impl PlanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "plans", db.operation = "select"))]
    pub async fn list_active(&self) -> Result<Vec<Plan>, AppError> {
        let plans = sqlx::query_as::<Postgres, Plan>(
            "SELECT * FROM plans WHERE is_active ORDER BY sort_order ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(plans)
    }

    #[tracing::instrument(skip(self), fields(db.table = "plans", db.operation = "select"))]
    pub async fn get(&self, tier: PlanTier) -> Result<Plan, AppError> {
        sqlx::query_as::<Postgres, Plan>("SELECT * FROM plans WHERE tier = $1")
            .bind(tier)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Plan {} not found", tier)))
    }

    #[tracing::instrument(skip(self, tx), fields(db.table = "plans", db.operation = "select"))]
    pub async fn get_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tier: PlanTier,
    ) -> Result<Plan, AppError> {
        sqlx::query_as::<Postgres, Plan>("SELECT * FROM plans WHERE tier = $1")
            .bind(tier)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Plan {} not found", tier)))
    }
}
